use super::error::GroupingError;
use super::query::{Query, QueryGroup};
use std::collections::{BTreeSet, HashMap};

pub fn group_queries(queries: &[Query]) -> Result<Vec<QueryGroup>, GroupingError> {
    let mut position = HashMap::with_capacity(queries.len());
    for (index, query) in queries.iter().enumerate() {
        if position.insert(query.id.as_str(), index).is_some() {
            return Err(GroupingError::DuplicateQuery {
                query: query.id.clone(),
            });
        }
    }

    let mut dependencies: Vec<BTreeSet<usize>> = Vec::with_capacity(queries.len());
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); queries.len()];
    for (index, query) in queries.iter().enumerate() {
        let mut deps = BTreeSet::new();
        for dependency in &query.depends_on {
            let Some(&dep_index) = position.get(dependency.as_str()) else {
                return Err(GroupingError::UnknownDependency {
                    query: query.id.clone(),
                    dependency: dependency.clone(),
                });
            };
            if deps.insert(dep_index) {
                dependents[dep_index].push(index);
            }
        }
        dependencies.push(deps);
    }

    let mut remaining: Vec<usize> = dependencies.iter().map(BTreeSet::len).collect();
    let mut assigned = vec![false; queries.len()];
    let mut frontier: Vec<usize> = (0..queries.len())
        .filter(|index| remaining[*index] == 0)
        .collect();
    let mut groups = Vec::new();

    while !frontier.is_empty() {
        frontier.sort_unstable();
        let mut next = Vec::new();
        for &index in &frontier {
            assigned[index] = true;
            for &dependent in &dependents[index] {
                remaining[dependent] -= 1;
                if remaining[dependent] == 0 {
                    next.push(dependent);
                }
            }
        }
        groups.push(QueryGroup {
            index: groups.len(),
            queries: frontier.iter().map(|&index| queries[index].clone()).collect(),
        });
        frontier = next;
    }

    if assigned.iter().all(|done| *done) {
        return Ok(groups);
    }

    Err(GroupingError::CyclicDependency {
        queries: cycle_members(queries, &assigned, &dependents)
            .into_iter()
            .map(|index| queries[index].id.clone())
            .collect(),
    })
}

// Unassigned queries either sit on a cycle or hang off one; peel the latter
// away by repeatedly dropping queries nothing unassigned depends on.
fn cycle_members(queries: &[Query], assigned: &[bool], dependents: &[Vec<usize>]) -> Vec<usize> {
    let mut alive: Vec<bool> = assigned.iter().map(|done| !done).collect();
    loop {
        let sinks: Vec<usize> = (0..queries.len())
            .filter(|&index| alive[index] && !dependents[index].iter().any(|&d| alive[d]))
            .collect();
        if sinks.is_empty() {
            break;
        }
        for index in sinks {
            alive[index] = false;
        }
    }
    (0..queries.len()).filter(|&index| alive[index]).collect()
}
