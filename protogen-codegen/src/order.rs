//! Dependency ordering of message types.
//!
//! A struct depends on every struct reachable through its field types
//! (following aliases, pointers, sequences and maps). Cycles are collapsed
//! with Tarjan's strongly connected components, and the resulting DAG is
//! scheduled with Kahn's algorithm. Ties are broken first by package path,
//! which keeps each package's messages together, and then by declaration
//! position within the package, so the order is the same on every run.

use protogen_model::{TypeKind, TypeModel, TypeRef};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, btree_set};

/// Stable tie-break key: package path, declaration index, name.
///
/// The package path leads so that independent types of one package stay
/// adjacent and the emitter prints each package header once where possible.
type SortKey = (String, usize, String);

/// Result of ordering a model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ordering {
    /// Struct types in emission order.
    pub types: Vec<TypeRef>,
    /// Mutually dependent groups, members in key order.
    pub cycles: Vec<Vec<TypeRef>>,
}

impl Ordering {
    /// Returns the position of a type in the emission order.
    #[must_use]
    pub fn position(&self, type_ref: &TypeRef) -> Option<usize> {
        self.types.iter().position(|t| t == type_ref)
    }
}

/// Collects the struct types reachable from `start` without passing through
/// another struct.
#[must_use]
pub fn struct_targets(model: &TypeModel, start: &TypeRef) -> BTreeSet<TypeRef> {
    let mut found = BTreeSet::new();
    let mut seen = BTreeSet::new();
    let mut stack = vec![start.clone()];

    while let Some(current) = stack.pop() {
        if !seen.insert(current.clone()) {
            continue;
        }
        let Some(def) = model.def(&current) else {
            continue;
        };
        match &def.kind {
            TypeKind::Struct(_) => {
                found.insert(current);
            }
            TypeKind::Primitive(_) => {}
            TypeKind::Alias(t) | TypeKind::Pointer(t) | TypeKind::Sequence(t) => {
                stack.push(t.clone());
            }
            TypeKind::Map(k, v) => {
                stack.push(k.clone());
                stack.push(v.clone());
            }
        }
    }

    found
}

/// Orders the struct types of `model` so dependencies come first.
#[must_use]
pub fn order(model: &TypeModel) -> Ordering {
    let nodes: Vec<TypeRef> = model
        .structs()
        .filter(|def| !def.type_ref.is_unnamed())
        .map(|def| def.type_ref.clone())
        .collect();
    let index: BTreeMap<&TypeRef, usize> = nodes.iter().enumerate().map(|(i, t)| (t, i)).collect();

    let keys: Vec<SortKey> = nodes
        .iter()
        .map(|t| {
            let decl_index = model.def(t).map_or(0, |d| d.decl_index);
            (t.package.clone(), decl_index, t.name.clone())
        })
        .collect();

    // deps[i] = nodes that must precede node i.
    let mut deps: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); nodes.len()];
    let mut self_loops = BTreeSet::new();
    for (i, node) in nodes.iter().enumerate() {
        let Some(fields) = model.def(node).and_then(|d| d.fields()) else {
            continue;
        };
        for field in fields {
            for target in struct_targets(model, &field.ty) {
                if let Some(&j) = index.get(&target) {
                    if i == j {
                        self_loops.insert(i);
                    } else {
                        deps[i].insert(j);
                    }
                }
            }
        }
    }

    let components = tarjan(&deps);
    let mut comp_of = vec![0; nodes.len()];
    for (c, members) in components.iter().enumerate() {
        for &m in members {
            comp_of[m] = c;
        }
    }

    // Condensation: edges from a dependency component to its dependents.
    let mut successors: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); components.len()];
    let mut indegree = vec![0usize; components.len()];
    for (i, ds) in deps.iter().enumerate() {
        for &j in ds {
            let (from, to) = (comp_of[j], comp_of[i]);
            if from != to && successors[from].insert(to) {
                indegree[to] += 1;
            }
        }
    }

    let comp_key = |c: usize| -> SortKey {
        components[c]
            .iter()
            .map(|&m| keys[m].clone())
            .min()
            .unwrap_or_default()
    };

    let mut ready: BinaryHeap<Reverse<(SortKey, usize)>> = (0..components.len())
        .filter(|&c| indegree[c] == 0)
        .map(|c| Reverse((comp_key(c), c)))
        .collect();

    let mut ordering = Ordering::default();
    while let Some(Reverse((_, c))) = ready.pop() {
        let mut members = components[c].clone();
        members.sort_by(|&a, &b| keys[a].cmp(&keys[b]));

        if members.len() > 1 || members.iter().any(|m| self_loops.contains(m)) {
            let cycle: Vec<TypeRef> = members.iter().map(|&m| nodes[m].clone()).collect();
            tracing::debug!(
                members = ?cycle.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "reference cycle"
            );
            ordering.cycles.push(cycle);
        }
        ordering
            .types
            .extend(members.iter().map(|&m| nodes[m].clone()));

        for &next in &successors[c] {
            indegree[next] -= 1;
            if indegree[next] == 0 {
                ready.push(Reverse((comp_key(next), next)));
            }
        }
    }

    ordering
}

/// Tarjan's strongly connected components over `edges[v]` = successors of `v`.
///
/// Depth-first search runs on an explicit frame stack, so long dependency
/// chains cannot exhaust the call stack.
fn tarjan(edges: &[BTreeSet<usize>]) -> Vec<Vec<usize>> {
    struct State {
        next_index: usize,
        index: Vec<Option<usize>>,
        lowlink: Vec<usize>,
        on_stack: Vec<bool>,
        stack: Vec<usize>,
        components: Vec<Vec<usize>>,
    }

    impl State {
        fn open(&mut self, v: usize) {
            self.index[v] = Some(self.next_index);
            self.lowlink[v] = self.next_index;
            self.next_index += 1;
            self.stack.push(v);
            self.on_stack[v] = true;
        }

        fn close(&mut self, v: usize) {
            if Some(self.lowlink[v]) != self.index[v] {
                return;
            }
            let mut component = Vec::new();
            while let Some(w) = self.stack.pop() {
                self.on_stack[w] = false;
                component.push(w);
                if w == v {
                    break;
                }
            }
            self.components.push(component);
        }
    }

    let n = edges.len();
    let mut state = State {
        next_index: 0,
        index: vec![None; n],
        lowlink: vec![0; n],
        on_stack: vec![false; n],
        stack: Vec::new(),
        components: Vec::new(),
    };
    // (node, remaining successors)
    let mut frames: Vec<(usize, btree_set::Iter<'_, usize>)> = Vec::new();

    for root in 0..n {
        if state.index[root].is_some() {
            continue;
        }
        state.open(root);
        frames.push((root, edges[root].iter()));

        while let Some(frame) = frames.last_mut() {
            let v = frame.0;
            match frame.1.next().copied() {
                Some(w) => match state.index[w] {
                    None => {
                        state.open(w);
                        frames.push((w, edges[w].iter()));
                    }
                    Some(wi) if state.on_stack[w] => {
                        state.lowlink[v] = state.lowlink[v].min(wi);
                    }
                    Some(_) => {}
                },
                None => {
                    frames.pop();
                    if let Some(&(parent, _)) = frames.last() {
                        state.lowlink[parent] = state.lowlink[parent].min(state.lowlink[v]);
                    }
                    state.close(v);
                }
            }
        }
    }

    state.components
}
