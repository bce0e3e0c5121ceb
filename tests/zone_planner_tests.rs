use zoneshard::{OverflowPolicy, Shard, Zone, ZoneAssignmentPlanner, ZoneError};

fn shards(count: usize) -> Vec<Shard> {
    (0..count)
        .map(|i| Shard::new(format!("shard{:02}", i), format!("host{}:27017", i)))
        .collect()
}

fn zones(count: usize) -> Vec<Zone> {
    (0..count)
        .map(|i| Zone::new(format!("zone{}", i), [format!("T{}", i)], format!("app_zone{}", i)))
        .collect()
}

#[test]
fn positional_assignment_whenever_shards_suffice() {
    let planner = ZoneAssignmentPlanner::default();
    for zone_count in 1..6 {
        for shard_count in zone_count..8 {
            let plan = planner.plan(&shards(shard_count), &zones(zone_count)).unwrap();
            assert_eq!(plan.len(), zone_count);
            for (i, assignment) in plan.iter().enumerate() {
                assert_eq!(assignment.zone, format!("zone{}", i));
                assert_eq!(assignment.shard_id, format!("shard{:02}", i));
            }
        }
    }
}

#[test]
fn overflow_zones_share_the_last_shard() {
    let planner = ZoneAssignmentPlanner::default();
    for shard_count in 1..5 {
        for zone_count in shard_count + 1..9 {
            let input_shards = shards(shard_count);
            let plan = planner.plan(&input_shards, &zones(zone_count)).unwrap();
            let last = &input_shards[shard_count - 1].id;
            for (i, assignment) in plan.iter().enumerate() {
                if i >= shard_count {
                    assert_eq!(&assignment.shard_id, last);
                } else {
                    assert_eq!(assignment.shard_id, input_shards[i].id);
                }
            }
        }
    }
}

#[test]
fn same_inputs_give_the_same_plan() {
    let input_shards = shards(3);
    let input_zones = zones(5);
    for policy in [OverflowPolicy::PinLast, OverflowPolicy::RoundRobin] {
        let planner = ZoneAssignmentPlanner::new(policy);
        let first = planner.plan(&input_shards, &input_zones).unwrap();
        for _ in 0..10 {
            assert_eq!(planner.plan(&input_shards, &input_zones).unwrap(), first);
        }
    }
}

#[test]
fn every_zone_is_planned_exactly_once() {
    let planner = ZoneAssignmentPlanner::new(OverflowPolicy::RoundRobin);
    let plan = planner.plan(&shards(2), &zones(7)).unwrap();
    let map = plan.to_map();
    assert_eq!(map.len(), 7);
    assert!((0..7).all(|i| plan.contains_zone(&format!("zone{}", i))));
    assert_eq!(map["zone6"], "shard00");
}

#[test]
fn planning_needs_zones_and_shards() {
    let planner = ZoneAssignmentPlanner::default();
    assert!(matches!(
        planner.plan(&shards(0), &zones(2)),
        Err(ZoneError::InvalidConfig(_))
    ));
    assert!(matches!(
        planner.plan(&shards(2), &zones(0)),
        Err(ZoneError::InvalidConfig(_))
    ));
}
