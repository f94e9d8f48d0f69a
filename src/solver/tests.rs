//! Whole-circuit solver tests.

use super::*;
use crate::circuit::{Circuit, ElementId, Position, VertexId};
use crate::components::{
    AcVoltageSource, Battery, Capacitor, ElementKind, Fuse, Inductor, IntegrationMethod,
    LightBulb, Resistor, Switch, Wire,
};
use approx::{assert_abs_diff_eq, assert_relative_eq};

fn vertex(c: &mut Circuit, name: &str) -> VertexId {
    c.add_vertex(name, Position::default())
}

fn add(c: &mut Circuit, name: &str, a: VertexId, b: VertexId, kind: ElementKind) -> ElementId {
    c.add_element(name, a, b, kind).unwrap()
}

/// Sum of currents leaving each vertex must vanish.
fn assert_kcl(c: &Circuit, solution: &Solution) {
    for v in c.vertices() {
        let mut net = 0.0;
        for id in c.neighbors_of(v.id) {
            let e = c.element(id).unwrap();
            let i = solution.element_current(id).unwrap();
            if e.start() == v.id {
                net += i;
            }
            if e.end() == v.id {
                net -= i;
            }
        }
        assert_abs_diff_eq!(net, 0.0, epsilon = 1e-6);
    }
}

/// 9 V battery with 10 Ω and 20 Ω in series.
fn series_circuit() -> (Circuit, [ElementId; 3]) {
    let mut c = Circuit::new();
    let n0 = vertex(&mut c, "0");
    let n1 = vertex(&mut c, "1");
    let n2 = vertex(&mut c, "2");
    let b = add(&mut c, "B1", n0, n1, ElementKind::Battery(Battery::new(9.0)));
    let r1 = add(&mut c, "R1", n1, n2, ElementKind::Resistor(Resistor::new(10.0)));
    let r2 = add(&mut c, "R2", n2, n0, ElementKind::Resistor(Resistor::new(20.0)));
    (c, [b, r1, r2])
}

#[test]
fn test_series_circuit() {
    let (c, [b, r1, r2]) = series_circuit();
    let sim = Simulator::new(c);
    let sol = sim.solve(0.01);

    for id in [b, r1, r2] {
        assert_relative_eq!(sol.element_current(id).unwrap(), 0.3, epsilon = 1e-9);
    }
    assert_relative_eq!(sol.element_voltage(r1).unwrap(), 3.0, epsilon = 1e-9);
    assert_relative_eq!(sol.element_voltage(r2).unwrap(), 6.0, epsilon = 1e-9);
    assert_kcl(sim.circuit(), &sol);
}

#[test]
fn test_kvl_around_loop() {
    let (c, [b, r1, r2]) = series_circuit();
    let sol = Simulator::new(c).solve(0.01);

    // Traversing the loop start → end through every element
    let sum: f64 = [b, r1, r2]
        .iter()
        .map(|id| sol.element_voltage(*id).unwrap())
        .sum();
    assert_abs_diff_eq!(sum, 0.0, epsilon = 1e-9);
}

#[test]
fn test_parallel_resistors() {
    let mut c = Circuit::new();
    let n0 = vertex(&mut c, "0");
    let n1 = vertex(&mut c, "1");
    let b = add(&mut c, "B1", n0, n1, ElementKind::Battery(Battery::new(9.0)));
    let r1 = add(&mut c, "R1", n1, n0, ElementKind::Resistor(Resistor::new(10.0)));
    let r2 = add(&mut c, "R2", n1, n0, ElementKind::Resistor(Resistor::new(10.0)));

    let sim = Simulator::new(c);
    let sol = sim.solve(0.01);
    assert_relative_eq!(sol.element_current(b).unwrap(), 1.8, epsilon = 1e-9);
    assert_relative_eq!(sol.element_current(r1).unwrap(), 0.9, epsilon = 1e-9);
    assert_relative_eq!(sol.element_current(r2).unwrap(), 0.9, epsilon = 1e-9);
    assert_kcl(sim.circuit(), &sol);
}

#[test]
fn test_open_switch_blocks_current() {
    let mut c = Circuit::new();
    let n0 = vertex(&mut c, "0");
    let n1 = vertex(&mut c, "1");
    let n2 = vertex(&mut c, "2");
    add(&mut c, "B1", n0, n1, ElementKind::Battery(Battery::new(9.0)));
    let sw = add(&mut c, "SW1", n1, n2, ElementKind::Switch(Switch::new(false)));
    let r = add(&mut c, "R1", n2, n0, ElementKind::Resistor(Resistor::new(10.0)));

    let mut sim = Simulator::new(c);
    let report = sim.step(0.01);
    assert!(!report.is_skipped());
    assert_eq!(sim.element_current("R1"), Some(0.0));
    assert_eq!(sim.element_current("SW1"), Some(0.0));
    // The open switch sees the full battery voltage across it
    let sol = sim.solve(0.01);
    assert_relative_eq!(sol.element_voltage(sw).unwrap(), 9.0, epsilon = 1e-9);
    assert_eq!(sol.element_current(r), Some(0.0));

    sim.set_switch("SW1", true).unwrap();
    sim.step(0.01);
    assert_relative_eq!(sim.element_current("R1").unwrap(), 0.9, epsilon = 1e-6);
}

#[test]
fn test_kcl_with_mixed_elements() {
    let mut c = Circuit::new();
    let n0 = vertex(&mut c, "0");
    let n1 = vertex(&mut c, "1");
    let n2 = vertex(&mut c, "2");
    let n3 = vertex(&mut c, "3");
    add(&mut c, "B1", n0, n1, ElementKind::Battery(Battery::with_internal_resistance(12.0, 0.5)));
    add(&mut c, "LB1", n1, n2, ElementKind::LightBulb(LightBulb::real_linear(10.0, 0.1)));
    add(&mut c, "R1", n2, n0, ElementKind::Resistor(Resistor::new(15.0)));
    add(&mut c, "C1", n2, n3, ElementKind::Capacitor(Capacitor::new(0.01)));
    add(&mut c, "W1", n3, n0, ElementKind::Wire(Wire::with_resistance(0.1)));
    add(&mut c, "LB2", n1, n0, ElementKind::LightBulb(LightBulb::ideal(20.0)));

    let mut sim = Simulator::new(c);
    for _ in 0..5 {
        sim.step(1.0 / 60.0);
    }
    let sol = sim.solve(1.0 / 60.0);
    assert_kcl(sim.circuit(), &sol);
}

#[test]
fn test_rc_charging_backward_euler() {
    // τ = RC = 0.1 s
    let mut c = Circuit::new();
    let n0 = vertex(&mut c, "0");
    let n1 = vertex(&mut c, "1");
    let n2 = vertex(&mut c, "2");
    add(&mut c, "B1", n0, n1, ElementKind::Battery(Battery::new(5.0)));
    add(&mut c, "R1", n1, n2, ElementKind::Resistor(Resistor::new(100.0)));
    let cap = add(&mut c, "C1", n2, n0, ElementKind::Capacitor(Capacitor::new(1e-3)));

    let mut sim = Simulator::new(c);
    for _ in 0..2 {
        sim.step(0.1);
    }
    assert_relative_eq!(sim.time(), 0.2, epsilon = 1e-12);

    let expected = 5.0 * (1.0 - (-2.0f64).exp());
    let v = sim.circuit().element(cap).unwrap().voltage_drop;
    assert_abs_diff_eq!(v, expected, epsilon = 0.1);
    assert!(v < 5.0);
}

#[test]
fn test_rc_charging_trapezoidal() {
    let mut c = Circuit::new();
    let n0 = vertex(&mut c, "0");
    let n1 = vertex(&mut c, "1");
    let n2 = vertex(&mut c, "2");
    add(&mut c, "B1", n0, n1, ElementKind::Battery(Battery::new(5.0)));
    add(&mut c, "R1", n1, n2, ElementKind::Resistor(Resistor::new(100.0)));
    let cap = add(&mut c, "C1", n2, n0, ElementKind::Capacitor(Capacitor::new(1e-3)));

    let config = SimulatorConfig::new().with_integration(IntegrationMethod::Trapezoidal);
    let mut sim = Simulator::with_config(c, config);
    for _ in 0..5 {
        sim.step(0.1);
    }

    let expected = 5.0 * (1.0 - (-5.0f64).exp());
    let v = sim.circuit().element(cap).unwrap().voltage_drop;
    assert_abs_diff_eq!(v, expected, epsilon = 0.05);
}

#[test]
fn test_rl_current_rise() {
    // τ = L/R = 0.1 s
    let mut c = Circuit::new();
    let n0 = vertex(&mut c, "0");
    let n1 = vertex(&mut c, "1");
    let n2 = vertex(&mut c, "2");
    add(&mut c, "B1", n0, n1, ElementKind::Battery(Battery::new(10.0)));
    add(&mut c, "R1", n1, n2, ElementKind::Resistor(Resistor::new(10.0)));
    let l = add(&mut c, "L1", n2, n0, ElementKind::Inductor(Inductor::new(1.0)));

    let mut sim = Simulator::new(c);
    sim.step(0.1);

    let expected = 1.0 - (-1.0f64).exp();
    let i = sim.circuit().element(l).unwrap().current;
    assert_abs_diff_eq!(i, expected, epsilon = 0.03);

    // Approaches V/R in steady state
    for _ in 0..20 {
        sim.step(0.1);
    }
    assert_abs_diff_eq!(sim.circuit().element(l).unwrap().current, 1.0, epsilon = 1e-3);
}

#[test]
fn test_real_bulb_matches_curve() {
    let mut c = Circuit::new();
    let n0 = vertex(&mut c, "0");
    let n1 = vertex(&mut c, "1");
    add(&mut c, "B1", n0, n1, ElementKind::Battery(Battery::new(9.0)));
    let lb = add(&mut c, "LB1", n1, n0, ElementKind::LightBulb(LightBulb::real_linear(10.0, 0.1)));

    let mut sim = Simulator::new(c);
    let report = sim.step(0.01);
    assert!(report.diagnostics.is_empty());

    let element = sim.circuit().element(lb).unwrap();
    let ElementKind::LightBulb(bulb) = &element.kind else {
        panic!("not a bulb");
    };
    let r = bulb.resistance;
    // R² - 10R - 81 = 0
    let expected = (10.0 + (100.0f64 + 4.0 * 81.0).sqrt()) / 2.0;
    assert_relative_eq!(r, expected, max_relative = 2e-3);
    assert_relative_eq!(element.current, 9.0 / r, max_relative = 1e-6);
}

#[test]
fn test_solve_is_idempotent() {
    let mut c = Circuit::new();
    let n0 = vertex(&mut c, "0");
    let n1 = vertex(&mut c, "1");
    add(&mut c, "B1", n0, n1, ElementKind::Battery(Battery::new(9.0)));
    add(&mut c, "LB1", n1, n0, ElementKind::LightBulb(LightBulb::real_linear(10.0, 0.1)));
    add(&mut c, "C1", n1, n0, ElementKind::Capacitor(Capacitor::new(1e-3)));

    let sim = Simulator::new(c);
    let a = sim.solve(0.01);
    let b = sim.solve(0.01);
    assert_eq!(a.vertex_voltages, b.vertex_voltages);
    assert_eq!(a.element_currents, b.element_currents);
    assert_eq!(a.bulb_resistances, b.bulb_resistances);
    assert_eq!(sim.time(), 0.0);
}

#[test]
fn test_fuse_trips_after_delay() {
    let mut c = Circuit::new();
    let n0 = vertex(&mut c, "0");
    let n1 = vertex(&mut c, "1");
    let n2 = vertex(&mut c, "2");
    add(&mut c, "B1", n0, n1, ElementKind::Battery(Battery::new(10.0)));
    let f = add(&mut c, "F1", n1, n2, ElementKind::Fuse(Fuse::new(1.0)));
    add(&mut c, "R1", n2, n0, ElementKind::Resistor(Resistor::new(2.0)));

    let mut sim = Simulator::new(c);
    // 5 A through a 1 A fuse; still intact after 0.03 s
    let report = sim.step(0.03);
    assert!(report.tripped_fuses.is_empty());
    assert!(sim.element_current("F1").unwrap() > 4.9);

    let report = sim.step(0.03);
    assert_eq!(report.tripped_fuses, vec![f]);
    sim.step(0.01);
    assert_eq!(sim.element_current("R1"), Some(0.0));

    sim.reset_fuse("F1").unwrap();
    sim.step(0.01);
    assert!(sim.element_current("R1").unwrap() > 4.9);
}

#[test]
fn test_singular_island_recovers() {
    let mut c = Circuit::new();
    let n0 = vertex(&mut c, "0");
    let n1 = vertex(&mut c, "1");
    // Two ideal batteries in parallel: a voltage-source loop
    add(&mut c, "B1", n0, n1, ElementKind::Battery(Battery::new(9.0)));
    add(&mut c, "B2", n0, n1, ElementKind::Battery(Battery::new(6.0)));
    // A healthy island beside it
    let m0 = vertex(&mut c, "a");
    let m1 = vertex(&mut c, "b");
    add(&mut c, "B3", m0, m1, ElementKind::Battery(Battery::new(3.0)));
    add(&mut c, "R1", m1, m0, ElementKind::Resistor(Resistor::new(3.0)));

    let mut sim = Simulator::new(c);
    let report = sim.step(0.01);
    let sol = report.solution.as_ref().unwrap();

    assert_eq!(sol.singular_islands(), 1);
    assert!(report
        .diagnostics
        .iter()
        .any(|e| matches!(e, crate::error::CckError::SingularSystem)));
    assert_eq!(sim.vertex_voltage("1"), Some(0.0));
    assert_relative_eq!(sim.element_current("R1").unwrap(), 1.0, epsilon = 1e-9);
}

fn capacitor_v_prev(sim: &Simulator, id: ElementId) -> f64 {
    match &sim.circuit().element(id).unwrap().kind {
        ElementKind::Capacitor(cap) => cap.v_prev,
        other => panic!("not a capacitor: {:?}", other),
    }
}

fn inductor_i_prev(sim: &Simulator, id: ElementId) -> f64 {
    match &sim.circuit().element(id).unwrap().kind {
        ElementKind::Inductor(l) => l.i_prev,
        other => panic!("not an inductor: {:?}", other),
    }
}

fn fuse_over_rating_time(sim: &Simulator, id: ElementId) -> f64 {
    match &sim.circuit().element(id).unwrap().kind {
        ElementKind::Fuse(f) => f.over_rating_time,
        other => panic!("not a fuse: {:?}", other),
    }
}

#[test]
fn test_singular_frame_keeps_dynamic_history() {
    let mut c = Circuit::new();
    let n0 = vertex(&mut c, "0");
    let n1 = vertex(&mut c, "1");
    let n2 = vertex(&mut c, "2");
    let n3 = vertex(&mut c, "3");
    let n4 = vertex(&mut c, "4");
    add(&mut c, "B1", n0, n1, ElementKind::Battery(Battery::new(5.0)));
    // RC branch, τ = 0.1 s
    add(&mut c, "R1", n1, n2, ElementKind::Resistor(Resistor::new(100.0)));
    let cap = add(&mut c, "C1", n2, n0, ElementKind::Capacitor(Capacitor::new(1e-3)));
    // Fuse and RL branch settling at 0.5 A, above the 0.1 A rating
    let mut fuse = Fuse::new(0.1);
    fuse.trip_delay = 100.0;
    let f = add(&mut c, "F1", n1, n3, ElementKind::Fuse(fuse));
    add(&mut c, "R2", n3, n4, ElementKind::Resistor(Resistor::new(10.0)));
    let l = add(&mut c, "L1", n4, n0, ElementKind::Inductor(Inductor::new(1.0)));

    let mut sim = Simulator::new(c);
    for _ in 0..10 {
        sim.step(0.1);
    }
    let v_prev = capacitor_v_prev(&sim, cap);
    let i_prev = inductor_i_prev(&sim, l);
    let over = fuse_over_rating_time(&sim, f);
    assert!(v_prev > 4.9);
    assert!(i_prev > 0.4);
    assert!(over > 0.5);

    // A second ideal battery across B1 makes the island singular
    let b2 = sim
        .circuit_mut()
        .add_element("B2", n0, n1, ElementKind::Battery(Battery::new(3.0)))
        .unwrap();
    let report = sim.step(0.01);
    assert_eq!(report.solution.as_ref().unwrap().singular_islands(), 1);
    assert_eq!(sim.element_current("C1"), Some(0.0));

    assert_eq!(capacitor_v_prev(&sim, cap), v_prev);
    assert_eq!(inductor_i_prev(&sim, l), i_prev);
    assert_eq!(fuse_over_rating_time(&sim, f), over);

    // Once the conflict is gone the charged state carries on
    sim.circuit_mut().remove_element(b2).unwrap();
    sim.step(0.01);
    let v = sim.circuit().element(cap).unwrap().voltage_drop;
    assert_abs_diff_eq!(v, 5.0, epsilon = 0.01);
    assert!(sim.element_current("L1").unwrap() > 0.4);
    assert!(fuse_over_rating_time(&sim, f) > over);
}

#[test]
fn test_skipped_capacitor_keeps_its_charge() {
    let mut c = Circuit::new();
    let n0 = vertex(&mut c, "0");
    let n1 = vertex(&mut c, "1");
    let n2 = vertex(&mut c, "2");
    add(&mut c, "B1", n0, n1, ElementKind::Battery(Battery::new(5.0)));
    add(&mut c, "R1", n1, n2, ElementKind::Resistor(Resistor::new(100.0)));
    let cap = add(&mut c, "C1", n2, n0, ElementKind::Capacitor(Capacitor::new(1e-3)));

    let mut sim = Simulator::new(c);
    for _ in 0..10 {
        sim.step(0.1);
    }
    let v_prev = capacitor_v_prev(&sim, cap);

    // Both terminals on one vertex: left out of the solve
    sim.circuit_mut().element_mut(cap).unwrap().vertices[1] = n2;
    let report = sim.step(0.01);
    assert_eq!(report.solution.as_ref().unwrap().skipped, vec![cap]);
    assert!(report.solution.as_ref().unwrap().is_held(cap));
    assert_eq!(capacitor_v_prev(&sim, cap), v_prev);

    sim.circuit_mut().element_mut(cap).unwrap().vertices[1] = n0;
    sim.step(0.01);
    let v = sim.circuit().element(cap).unwrap().voltage_drop;
    assert_abs_diff_eq!(v, v_prev, epsilon = 0.01);
}

#[test]
fn test_ac_source_follows_sine() {
    let mut c = Circuit::new();
    let n0 = vertex(&mut c, "0");
    let n1 = vertex(&mut c, "1");
    add(&mut c, "AC1", n0, n1, ElementKind::AcVoltage(AcVoltageSource::new(10.0, 1.0, 0.0)));
    add(&mut c, "R1", n1, n0, ElementKind::Resistor(Resistor::new(10.0)));

    let mut sim = Simulator::new(c);
    // Quarter period in 0.05 s steps
    for _ in 0..5 {
        sim.step(0.05);
    }
    assert_relative_eq!(sim.time(), 0.25, epsilon = 1e-9);
    assert_relative_eq!(sim.element_current("R1").unwrap(), 1.0, epsilon = 1e-6);
    assert_relative_eq!(sim.vertex_voltage("1").unwrap(), 10.0, epsilon = 1e-6);
}

#[test]
fn test_invalid_element_is_skipped() {
    let (mut c, [_, r1, _]) = series_circuit();
    let n3 = vertex(&mut c, "3");
    let bad = add(&mut c, "R3", n3, VertexId(0), ElementKind::Resistor(Resistor::new(1.0)));
    c.element_mut(bad).unwrap().vertices[1] = VertexId(99);

    let sol = Simulator::new(c).solve(0.01);
    assert_eq!(sol.skipped, vec![bad]);
    assert_eq!(sol.element_current(bad), Some(0.0));
    assert_relative_eq!(sol.element_current(r1).unwrap(), 0.3, epsilon = 1e-9);
}

#[test]
fn test_pause_and_invalid_steps_are_skipped() {
    let (c, _) = series_circuit();
    let mut sim = Simulator::new(c);

    for dt in [2.0, -0.1, 0.0, f64::NAN, f64::INFINITY] {
        let report = sim.step(dt);
        assert!(report.is_skipped());
        assert_eq!(sim.time(), 0.0);
    }
    assert_eq!(sim.element_current("R1"), Some(0.0));
}

#[test]
fn test_long_step_is_clamped_and_subdivided() {
    let (c, _) = series_circuit();
    let mut sim = Simulator::new(c);

    let report = sim.step(0.5);
    match report.outcome {
        StepOutcome::Stepped { substeps, dt } => {
            assert_relative_eq!(dt, DEFAULT_MAX_DT);
            assert_eq!(substeps, 12);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_relative_eq!(sim.time(), DEFAULT_MAX_DT, epsilon = 1e-12);
}

#[test]
fn test_step_limits_stay_positive_and_bounded() {
    let config = SimulatorConfig::new().with_max_dt(-1.0).with_max_substep(0.0);
    assert_eq!(config.max_dt, MIN_STEP);
    assert_eq!(config.max_substep, MIN_STEP);

    let (c, _) = series_circuit();
    let mut sim = Simulator::with_config(c, config);
    match sim.step(0.01).outcome {
        StepOutcome::Stepped { substeps, dt } => {
            assert_eq!(dt, MIN_STEP);
            assert_eq!(substeps, 1);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert!(sim.time() > 0.0);

    // A hand-built config gets the same floors
    let mut config = SimulatorConfig::new().with_max_dt(0.5);
    config.max_substep = 0.0;
    let (c, _) = series_circuit();
    let mut sim = Simulator::with_config(c, config);
    match sim.step(0.5).outcome {
        StepOutcome::Stepped { substeps, dt } => {
            assert_relative_eq!(dt, 0.5);
            assert_eq!(substeps, MAX_SUBSTEPS);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_relative_eq!(sim.element_current("R1").unwrap(), 0.3, epsilon = 1e-9);
}

#[test]
fn test_current_sense_latches() {
    let (c, _) = series_circuit();
    let mut sim = Simulator::new(c);
    sim.step(0.01);

    let r1 = sim.circuit().find_element("R1").unwrap();
    let element = sim.circuit().element(r1).unwrap();
    assert_eq!(element.current_sense, crate::circuit::CurrentSense::Forward);
    assert_relative_eq!(element.displayed_current(), 0.3, epsilon = 1e-9);
}

#[test]
fn test_refresh_keeps_clock_and_history() {
    let mut c = Circuit::new();
    let n0 = vertex(&mut c, "0");
    let n1 = vertex(&mut c, "1");
    let n2 = vertex(&mut c, "2");
    add(&mut c, "B1", n0, n1, ElementKind::Battery(Battery::new(5.0)));
    add(&mut c, "R1", n1, n2, ElementKind::Resistor(Resistor::new(100.0)));
    let cap = add(&mut c, "C1", n2, n0, ElementKind::Capacitor(Capacitor::new(1e-3)));

    let mut sim = Simulator::new(c);
    sim.step(0.1);
    let v_before = sim.circuit().element(cap).unwrap().voltage_drop;

    sim.refresh();
    assert_relative_eq!(sim.time(), 0.1, epsilon = 1e-12);
    let v_after = sim.circuit().element(cap).unwrap().voltage_drop;
    assert_abs_diff_eq!(v_after, v_before, epsilon = 1e-6);

    sim.reset();
    assert_eq!(sim.time(), 0.0);
    assert_eq!(sim.circuit().element(cap).unwrap().voltage_drop, 0.0);
}

#[test]
fn test_set_switch_rejects_other_elements() {
    let (c, _) = series_circuit();
    let mut sim = Simulator::new(c);
    assert!(sim.set_switch("R1", true).is_err());
    assert!(matches!(
        sim.set_switch("nope", true),
        Err(crate::error::CckError::UnknownName { .. })
    ));
    assert!(sim.reset_fuse("B1").is_err());
}
