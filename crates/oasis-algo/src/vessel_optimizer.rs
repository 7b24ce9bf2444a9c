//! Time-space network vessel optimizer (§4.6): builds a minimum-cost-flow
//! network over requirement loading windows, solves an LP relaxation of the
//! deployment/penalty objective, and walks the resulting flow into concrete
//! vessel routes.

use std::collections::{HashMap, HashSet};

use good_lp::solvers::clarabel::clarabel;
use good_lp::{constraint, variable, variables, Expression, Solution, SolverModel, Variable};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use tracing::warn;

use oasis_core::error::{OasisError, OasisResult};
use oasis_core::model::{DayRange, FeedstockParcel, FeedstockRequirement, Route, RouteSegment, Vessel};

pub const MAX_VESSELS: u32 = 5;
pub const DEFAULT_COST_PER_DEPLOYED_VESSEL: f64 = 1000.0;
pub const DEFAULT_PENALTY_PER_UNMET_REQUIREMENT: f64 = 100_000.0;

const REFINERY: &str = "Refinery";

/// A deployable vessel class; the extractor always draws from the largest
/// available type (§4.6 extraction).
#[derive(Debug, Clone, Copy)]
pub struct VesselType {
    pub capacity: f64,
    pub cost: f64,
}

impl VesselType {
    pub fn new(capacity: f64, cost: f64) -> Self {
        Self { capacity, cost }
    }
}

/// Tunables for a vessel-optimizer solve. `horizon_days` does not clip the
/// network built below (the reference accepts it as a parameter but never
/// uses it to bound node generation — node generation is bounded purely by
/// each requirement's `allowed_ldr`); it is retained for test/API parity.
#[derive(Debug, Clone, Copy)]
pub struct VesselOptimizerConfig {
    pub horizon_days: u32,
    pub time_limit_seconds: f64,
    pub relative_mip_gap: f64,
    pub max_vessels: u32,
    pub cost_per_deployed_vessel: f64,
    pub penalty_per_unmet_requirement: f64,
}

impl Default for VesselOptimizerConfig {
    fn default() -> Self {
        Self {
            horizon_days: 30,
            time_limit_seconds: 3000.0,
            relative_mip_gap: 0.05,
            max_vessels: MAX_VESSELS,
            cost_per_deployed_vessel: DEFAULT_COST_PER_DEPLOYED_VESSEL,
            penalty_per_unmet_requirement: DEFAULT_PENALTY_PER_UNMET_REQUIREMENT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum NodeKind {
    Source,
    Sink,
    Deploy(String, u32),
    Loading(String, u32, usize),
    Delivery(u32, usize),
}

impl NodeKind {
    fn location_and_day(&self) -> Option<(&str, u32)> {
        match self {
            NodeKind::Deploy(origin, day) => Some((origin.as_str(), *day)),
            NodeKind::Loading(origin, day, _) => Some((origin.as_str(), *day)),
            NodeKind::Delivery(day, _) => Some((REFINERY, *day)),
            NodeKind::Source | NodeKind::Sink => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeAction {
    Deploy,
    EnterLoading,
    RequirementFlow,
    Deliver,
    Wait,
    Travel,
}

#[derive(Debug, Clone, Copy)]
struct EdgeData {
    action: EdgeAction,
    capacity: f64,
    cost: f64,
    requirement: Option<usize>,
}

fn route_between<'a>(
    routes: &'a HashMap<(String, String), Route>,
    from: &str,
    to: &str,
) -> OasisResult<&'a Route> {
    routes.get(&(from.to_string(), to.to_string())).ok_or_else(|| {
        OasisError::Validation(format!("no route from '{from}' to '{to}'"))
    })
}

fn get_or_insert_node(
    graph: &mut DiGraph<NodeKind, EdgeData>,
    index: &mut HashMap<NodeKind, NodeIndex>,
    kind: NodeKind,
) -> NodeIndex {
    if let Some(&idx) = index.get(&kind) {
        idx
    } else {
        let idx = graph.add_node(kind.clone());
        index.insert(kind, idx);
        idx
    }
}

/// Build the time-space network of §4.6. Returns the graph, a lookup from
/// `NodeKind` to index, and the source/sink indices.
fn build_network(
    requirements: &[FeedstockRequirement],
    routes: &HashMap<(String, String), Route>,
    config: &VesselOptimizerConfig,
) -> OasisResult<(DiGraph<NodeKind, EdgeData>, HashMap<NodeKind, NodeIndex>, NodeIndex, NodeIndex)> {
    let mut graph = DiGraph::new();
    let mut index = HashMap::new();
    let source = get_or_insert_node(&mut graph, &mut index, NodeKind::Source);
    let sink = get_or_insert_node(&mut graph, &mut index, NodeKind::Sink);

    let mut deploy_edges_seen: HashSet<(NodeIndex, NodeIndex)> = HashSet::new();
    let mut loading_nodes: Vec<(NodeIndex, usize, u32, String)> = Vec::new();

    for (req_idx, requirement) in requirements.iter().enumerate() {
        let to_refinery = route_between(routes, &requirement.origin, REFINERY)?;
        for day in requirement.allowed_ldr.days() {
            let deploy = get_or_insert_node(
                &mut graph,
                &mut index,
                NodeKind::Deploy(requirement.origin.clone(), day),
            );
            let loading = get_or_insert_node(
                &mut graph,
                &mut index,
                NodeKind::Loading(requirement.origin.clone(), day, req_idx),
            );
            let delivery_day = day + 1 + to_refinery.time_travel;
            let delivery = get_or_insert_node(&mut graph, &mut index, NodeKind::Delivery(delivery_day, req_idx));

            if deploy_edges_seen.insert((source, deploy)) {
                graph.add_edge(
                    source,
                    deploy,
                    EdgeData {
                        action: EdgeAction::Deploy,
                        capacity: 1.0,
                        cost: config.cost_per_deployed_vessel,
                        requirement: None,
                    },
                );
            }
            graph.add_edge(
                deploy,
                loading,
                EdgeData {
                    action: EdgeAction::EnterLoading,
                    capacity: config.max_vessels as f64,
                    cost: 0.0,
                    requirement: None,
                },
            );
            graph.add_edge(
                loading,
                delivery,
                EdgeData {
                    action: EdgeAction::RequirementFlow,
                    capacity: 1.0,
                    cost: 0.0,
                    requirement: Some(req_idx),
                },
            );
            graph.add_edge(
                delivery,
                sink,
                EdgeData {
                    action: EdgeAction::Deliver,
                    capacity: 1.0,
                    cost: 0.0,
                    requirement: Some(req_idx),
                },
            );

            loading_nodes.push((loading, req_idx, day, requirement.origin.clone()));
        }
    }

    for (i, (ln1, _req1, day1, origin1)) in loading_nodes.iter().enumerate() {
        for (j, (ln2, _req2, day2, origin2)) in loading_nodes.iter().enumerate() {
            if i == j {
                continue;
            }
            if origin1 == origin2 {
                if day2 > day1 {
                    graph.add_edge(
                        *ln1,
                        *ln2,
                        EdgeData {
                            action: EdgeAction::Wait,
                            capacity: config.max_vessels as f64,
                            cost: 0.0,
                            requirement: None,
                        },
                    );
                }
            } else {
                let route = route_between(routes, origin1, origin2)?;
                let earliest_arrival = day1 + 1 + route.time_travel;
                if earliest_arrival <= *day2 {
                    graph.add_edge(
                        *ln1,
                        *ln2,
                        EdgeData {
                            action: EdgeAction::Travel,
                            capacity: config.max_vessels as f64,
                            cost: 0.0,
                            requirement: None,
                        },
                    );
                }
            }
        }
    }

    Ok((graph, index, source, sink))
}

/// Solve the vessel deployment problem (§4.6) and return the extracted
/// vessel fleet. Requirements are satisfied on a best-effort basis: any left
/// unmet (via the slack variable) simply do not appear as vessel cargo.
pub fn optimize(
    requirements: &[FeedstockRequirement],
    routes: &HashMap<(String, String), Route>,
    vessel_types: &[VesselType],
    config: &VesselOptimizerConfig,
) -> OasisResult<Vec<Vessel>> {
    if vessel_types.is_empty() {
        return Err(OasisError::Validation("no vessel types provided".into()));
    }
    if requirements.is_empty() {
        return Ok(Vec::new());
    }

    let (graph, _index, source, sink) = build_network(requirements, routes, config)?;

    let mut vars = variables!();
    let mut flow_vars: HashMap<(NodeIndex, NodeIndex), Variable> = HashMap::new();
    for edge in graph.edge_indices() {
        let (u, v) = graph.edge_endpoints(edge).unwrap();
        let data = graph.edge_weight(edge).unwrap();
        flow_vars.insert((u, v), vars.add(variable().min(0.0).max(data.capacity)));
    }
    let unmet = vars.add(variable().min(0.0).max(requirements.len() as f64));

    let mut objective = Expression::from(0.0);
    for edge in graph.edge_indices() {
        let data = graph.edge_weight(edge).unwrap();
        if data.action == EdgeAction::Deploy {
            let (u, v) = graph.edge_endpoints(edge).unwrap();
            objective += data.cost * flow_vars[&(u, v)];
        }
    }
    objective += config.penalty_per_unmet_requirement * unmet;

    let mut model = vars.minimise(objective).using(clarabel);

    for node in graph.node_indices() {
        let incoming: Expression = graph
            .edges_directed(node, Direction::Incoming)
            .map(|e| Expression::from(flow_vars[&(e.source(), e.target())]))
            .fold(Expression::from(0.0), |acc, e| acc + e);
        let outgoing: Expression = graph
            .edges_directed(node, Direction::Outgoing)
            .map(|e| Expression::from(flow_vars[&(e.source(), e.target())]))
            .fold(Expression::from(0.0), |acc, e| acc + e);

        match graph.node_weight(node).unwrap() {
            NodeKind::Sink => {
                model = model.with(constraint!(incoming + Expression::from(unmet) == requirements.len() as f64));
            }
            NodeKind::Source => {
                model = model.with(constraint!(incoming - outgoing == -(requirements.len() as f64)));
            }
            _ => {
                model = model.with(constraint!(incoming - outgoing == 0.0));
            }
        }
    }

    let mut deploy_total = Expression::from(0.0);
    for edge in graph.edge_indices() {
        let data = graph.edge_weight(edge).unwrap();
        if data.action == EdgeAction::Deploy {
            let (u, v) = graph.edge_endpoints(edge).unwrap();
            deploy_total += flow_vars[&(u, v)];
        }
    }
    model = model.with(constraint!(deploy_total <= config.max_vessels as f64));

    let solution = match model.solve() {
        Ok(solution) => solution,
        Err(err) => {
            warn!("vessel optimizer solve failed, no vessels deployed: {err:?}");
            return Ok(Vec::new());
        }
    };

    let mut residual: HashMap<(NodeIndex, NodeIndex), f64> = HashMap::new();
    for (&(u, v), &var) in &flow_vars {
        let value = solution.value(var).round();
        if value > 0.0 {
            residual.insert((u, v), value);
        }
    }

    Ok(extract_vessels(&graph, source, sink, &mut residual, requirements, vessel_types))
}

/// Walk the residual flow of a solved network into concrete vessels, per
/// §4.6 "Extraction".
fn extract_vessels(
    graph: &DiGraph<NodeKind, EdgeData>,
    source: NodeIndex,
    sink: NodeIndex,
    residual: &mut HashMap<(NodeIndex, NodeIndex), f64>,
    requirements: &[FeedstockRequirement],
    vessel_types: &[VesselType],
) -> Vec<Vessel> {
    let largest = vessel_types
        .iter()
        .max_by(|a, b| a.capacity.partial_cmp(&b.capacity).unwrap())
        .expect("vessel_types checked non-empty by caller");

    let mut deploy_targets: Vec<NodeIndex> = graph
        .edges_directed(source, Direction::Outgoing)
        .filter(|e| graph.edge_weight(e.id()).unwrap().action == EdgeAction::Deploy)
        .map(|e| e.target())
        .filter(|target| residual.get(&(source, *target)).copied().unwrap_or(0.0) > 0.0)
        .collect();
    deploy_targets.sort_by_key(|idx| format!("{:?}", graph.node_weight(*idx).unwrap()));

    let mut assigned: HashSet<usize> = HashSet::new();
    let mut vessels = Vec::new();
    let mut vessel_counter = 0usize;

    for deploy in deploy_targets {
        loop {
            let available = residual.get(&(source, deploy)).copied().unwrap_or(0.0);
            if available < 1.0 {
                break;
            }
            *residual.get_mut(&(source, deploy)).unwrap() -= 1.0;

            let vessel_id = format!("Vessel_{vessel_counter}");
            vessel_counter += 1;

            let (cargo, route, arrival_day) =
                walk_vessel(graph, deploy, sink, residual, requirements, largest.capacity, &mut assigned);

            if cargo.is_empty() {
                continue;
            }

            let mut vessel = Vessel::new(vessel_id, arrival_day, largest.capacity, largest.cost);
            vessel.cargo = cargo;
            vessel.route = route;
            vessels.push(vessel);
        }
    }

    vessels
}

fn walk_vessel(
    graph: &DiGraph<NodeKind, EdgeData>,
    start: NodeIndex,
    sink: NodeIndex,
    residual: &mut HashMap<(NodeIndex, NodeIndex), f64>,
    requirements: &[FeedstockRequirement],
    vessel_capacity: f64,
    assigned: &mut HashSet<usize>,
) -> (Vec<FeedstockParcel>, Vec<RouteSegment>, u32) {
    let mut current = start;
    let mut cargo: Vec<FeedstockParcel> = Vec::new();
    let mut grades: HashSet<String> = HashSet::new();
    let mut capacity_used = 0.0;
    let mut route: Vec<RouteSegment> = Vec::new();
    let mut visited: HashSet<NodeIndex> = HashSet::new();

    loop {
        if current == sink {
            break;
        }
        if !visited.insert(current) {
            break;
        }

        let mut just_loaded = None;
        if let NodeKind::Loading(_, day, req_idx) = graph.node_weight(current).unwrap() {
            let (day, req_idx) = (*day, *req_idx);
            if !assigned.contains(&req_idx) {
                let requirement = &requirements[req_idx];
                let will_have_new_grade = !grades.contains(&requirement.grade);
                let grades_after = grades.len() + if will_have_new_grade { 1 } else { 0 };
                if capacity_used + requirement.volume <= vessel_capacity && grades_after <= 3 {
                    let has_flow = graph
                        .edges_directed(current, Direction::Outgoing)
                        .any(|e| {
                            graph.edge_weight(e.id()).unwrap().action == EdgeAction::RequirementFlow
                                && graph.edge_weight(e.id()).unwrap().requirement == Some(req_idx)
                                && residual.get(&(e.source(), e.target())).copied().unwrap_or(0.0) > 0.0
                        });
                    if has_flow {
                        assigned.insert(req_idx);
                        capacity_used += requirement.volume;
                        grades.insert(requirement.grade.clone());
                        let ldr = DayRange::new(day, day).expect("single-day loading window");
                        if let Ok(parcel) =
                            FeedstockParcel::new(requirement.grade.clone(), requirement.volume, ldr, requirement.origin.clone())
                        {
                            cargo.push(parcel);
                            just_loaded = Some(req_idx);
                        }
                    }
                }
            }
        }

        let options: Vec<(NodeIndex, EdgeAction, Option<usize>)> = graph
            .edges_directed(current, Direction::Outgoing)
            .filter(|e| residual.get(&(e.source(), e.target())).copied().unwrap_or(0.0) > 0.0)
            .filter(|e| {
                let data = graph.edge_weight(e.id()).unwrap();
                !(data.action == EdgeAction::RequirementFlow && cargo.is_empty() && just_loaded.is_none())
            })
            .map(|e| {
                let data = graph.edge_weight(e.id()).unwrap();
                (e.target(), data.action, data.requirement)
            })
            .collect();

        let chosen = if let Some(req_idx) = just_loaded {
            options
                .iter()
                .find(|(_, action, requirement)| *action == EdgeAction::RequirementFlow && *requirement == Some(req_idx))
                .copied()
        } else {
            [EdgeAction::Wait, EdgeAction::Travel, EdgeAction::EnterLoading, EdgeAction::Deliver]
                .iter()
                .find_map(|preferred| options.iter().find(|(_, action, _)| action == preferred).copied())
                .or_else(|| options.first().copied())
        };

        let Some((next, action, _)) = chosen else {
            break;
        };

        *residual.get_mut(&(current, next)).unwrap() -= 1.0;

        if matches!(action, EdgeAction::Travel | EdgeAction::RequirementFlow) {
            if let (Some((from, day_start)), Some((to, day_end))) =
                (graph.node_weight(current).unwrap().location_and_day(), graph.node_weight(next).unwrap().location_and_day())
            {
                route.push(RouteSegment::Travel {
                    from: from.to_string(),
                    to: to.to_string(),
                    day_start,
                    day_end,
                });
            }
        } else if action == EdgeAction::Wait {
            if let (Some((at, day_start)), Some((_, day_end))) =
                (graph.node_weight(current).unwrap().location_and_day(), graph.node_weight(next).unwrap().location_and_day())
            {
                route.push(RouteSegment::Wait {
                    at: at.to_string(),
                    day_start,
                    day_end,
                });
            }
        }

        current = next;
    }

    let arrival_day = route
        .iter()
        .filter_map(|segment| match segment {
            RouteSegment::Travel { to, day_end, .. } if to == REFINERY => Some(*day_end),
            _ => None,
        })
        .max()
        .or_else(|| route.iter().map(|s| s.day_end()).max())
        .unwrap_or(0);

    (cargo, route, arrival_day)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn routes_fixture() -> HashMap<(String, String), Route> {
        let mut routes = HashMap::new();
        for origin in ["X", "Y", "Z"] {
            routes.insert((origin.to_string(), REFINERY.to_string()), Route::new(3, 100.0));
        }
        for a in ["X", "Y", "Z"] {
            for b in ["X", "Y", "Z"] {
                if a != b {
                    routes.insert((a.to_string(), b.to_string()), Route::new(3, 50.0));
                }
            }
        }
        routes
    }

    #[test]
    fn rejects_missing_route() {
        let requirement =
            FeedstockRequirement::new("A", 100.0, "Unknown", DayRange::new(1, 1).unwrap(), 10).unwrap();
        let routes = HashMap::new();
        let vessel_types = vec![VesselType::new(500.0, 2000.0)];
        let config = VesselOptimizerConfig::default();
        let result = optimize(&[requirement], &routes, &vessel_types, &config);
        assert!(result.is_err());
    }

    #[test]
    fn empty_requirements_return_empty_fleet() {
        let routes = routes_fixture();
        let vessel_types = vec![VesselType::new(500.0, 2000.0)];
        let config = VesselOptimizerConfig::default();
        let result = optimize(&[], &routes, &vessel_types, &config).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn s4_three_origins_respects_max_vessels_and_ldr() {
        let routes = routes_fixture();
        let vessel_types = vec![VesselType::new(500.0, 2000.0)];
        let requirements = vec![
            FeedstockRequirement::new("A", 100.0, "X", DayRange::new(1, 3).unwrap(), 15).unwrap(),
            FeedstockRequirement::new("B", 100.0, "Y", DayRange::new(1, 3).unwrap(), 15).unwrap(),
            FeedstockRequirement::new("C", 100.0, "Z", DayRange::new(1, 3).unwrap(), 15).unwrap(),
        ];
        let config = VesselOptimizerConfig {
            max_vessels: 2,
            horizon_days: 15,
            ..VesselOptimizerConfig::default()
        };

        let vessels = optimize(&requirements, &routes, &vessel_types, &config).unwrap();

        assert!(vessels.len() <= 2);
        for vessel in &vessels {
            vessel.validate_cargo_bounds().unwrap();
            for parcel in &vessel.cargo {
                let requirement = requirements.iter().find(|r| r.grade == parcel.grade).unwrap();
                assert!(requirement.allowed_ldr.contains(parcel.ldr.start));
            }
        }
    }
}
