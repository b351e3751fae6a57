//! Car motion and traffic light timer tests

use traffic_sim::simulation::{
    CarId, CarUpdateResult, Intersection, IntersectionId, LightPhase, Position, SimCar,
    SimTrafficLight, TrafficLightId, TrafficLightRecord,
};

fn path_abc() -> Vec<Intersection> {
    vec![
        Intersection::new(IntersectionId(1), 0.0, 0.0, false),
        Intersection::new(IntersectionId(2), 3.0, 0.0, false),
        Intersection::new(IntersectionId(3), 3.0, 4.0, true),
    ]
}

#[test]
fn test_car_starts_on_first_waypoint() {
    let car = SimCar::new(CarId(7), path_abc()).expect("path is long enough");
    assert_eq!(car.position, Position::new(0.0, 0.0));
    assert_eq!(car.current_path_index, 1);
    assert_eq!(car.current_target().map(|i| i.id), Some(IntersectionId(2)));
}

#[test]
fn test_car_rejects_short_paths() {
    assert!(SimCar::new(CarId(0), Vec::new()).is_none());
    assert!(SimCar::new(CarId(0), path_abc()[..1].to_vec()).is_none());
}

#[test]
fn test_car_snaps_to_waypoint_within_reach() {
    let mut car = SimCar::new(CarId(0), path_abc()).expect("valid path");

    // Travel distance equal to |AB| lands exactly on B
    let result = car.advance(3.0);
    assert_eq!(result, CarUpdateResult::ReachedWaypoint);
    assert_eq!(car.position, Position::new(3.0, 0.0));
    assert_eq!(car.current_path_index, 2);

    let mut car = SimCar::new(CarId(1), path_abc()).expect("valid path");
    assert_eq!(car.advance(10.0), CarUpdateResult::ReachedWaypoint);
    assert_eq!(car.position, Position::new(3.0, 0.0));
    assert_eq!(car.current_path_index, 2);
}

#[test]
fn test_car_moves_exactly_speed_towards_target() {
    let mut car = SimCar::new(CarId(0), path_abc()).expect("valid path");
    assert_eq!(car.advance(1.0), CarUpdateResult::Moved);
    assert!((car.position.x - 1.0).abs() < 1e-12);
    assert!(car.position.y.abs() < 1e-12);
    assert_eq!(car.current_path_index, 1);

    // Second leg runs along +y
    car.advance(5.0);
    assert_eq!(car.advance(1.5), CarUpdateResult::Moved);
    assert!((car.position.x - 3.0).abs() < 1e-12);
    assert!((car.position.y - 1.5).abs() < 1e-12);
}

#[test]
fn test_car_eventually_arrives() {
    let mut car = SimCar::new(CarId(0), path_abc()).expect("valid path");
    let mut last = CarUpdateResult::Moved;
    let mut steps = 0;
    let mut previous_index = car.current_path_index;

    while last != CarUpdateResult::Arrived {
        last = car.advance(0.7);
        assert!(car.current_path_index >= previous_index);
        previous_index = car.current_path_index;
        steps += 1;
        assert!(steps < 100, "car never arrived");
    }

    assert!(car.has_reached_final_destination());
    assert_eq!(car.current_path_index, 3);
    assert_eq!(car.position, Position::new(3.0, 4.0));
    assert!(car.current_target().is_none());
}

#[test]
fn test_car_without_target_despawns() {
    let mut car = SimCar::new(CarId(0), path_abc()).expect("valid path");
    car.current_path_index = 3;
    assert_eq!(car.advance(1.0), CarUpdateResult::Despawn);
    assert!(CarUpdateResult::Despawn.is_removal());
    assert!(CarUpdateResult::Arrived.is_removal());
    assert!(!CarUpdateResult::ReachedWaypoint.is_removal());
}

#[test]
fn test_light_flips_once_at_duration() {
    let mut light = SimTrafficLight::new(TrafficLightId(1), IntersectionId(3), 20.0);
    assert_eq!(light.phase, LightPhase::NsGreen);

    assert!(light.tick(20.0));
    assert_eq!(light.phase, LightPhase::EwGreen);
    assert_eq!(light.elapsed, 0.0);
}

#[test]
fn test_light_accumulates_before_flipping() {
    let mut light = SimTrafficLight::new(TrafficLightId(1), IntersectionId(3), 20.0);

    assert!(!light.tick(10.0));
    assert!(!light.tick(9.5));
    assert_eq!(light.phase, LightPhase::NsGreen);
    assert!((light.elapsed - 19.5).abs() < 1e-12);

    assert!(light.tick(0.5));
    assert_eq!(light.phase, LightPhase::EwGreen);

    // A huge step still flips only once
    assert!(light.tick(100.0));
    assert_eq!(light.phase, LightPhase::NsGreen);
    assert_eq!(light.elapsed, 0.0);
}

#[test]
fn test_light_from_record_keeps_stored_phase() {
    let record = TrafficLightRecord {
        id: TrafficLightId(4),
        intersection_id: IntersectionId(2),
        current_state: Some("EW_GREEN".to_string()),
    };
    let light = SimTrafficLight::from_record(&record, 20.0);
    assert_eq!(light.phase, LightPhase::EwGreen);
    assert_eq!(light.intersection_id, IntersectionId(2));

    let unknown = TrafficLightRecord {
        current_state: Some("RED".to_string()),
        ..record
    };
    assert_eq!(
        SimTrafficLight::from_record(&unknown, 20.0).phase,
        LightPhase::NsGreen
    );
}
