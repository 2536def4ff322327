//! The assembled control system: sensors → logic → controllers → actuators.

use serde::{Deserialize, Serialize};

use crate::actuator::Actuator;
use crate::controller::{PiController, PiState};
use crate::error::{ControlError, ControlResult};
use crate::logic::{LogicBlock, SignalRef};
use crate::sensor::Sensor;

/// A controller wired to one input signal and one actuator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerBinding {
    pub controller: PiController,
    pub state: PiState,
    pub input: SignalRef,
    /// Index into the actuator list.
    pub actuator: usize,
}

/// A command produced for one actuator this step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActuatorCommand {
    /// Index into the actuator list.
    pub actuator: usize,
    pub value: f64,
}

/// Validated bundle of control elements.
///
/// Logic blocks are evaluated in a topological order fixed at build time;
/// a dependency cycle is a construction error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlSystem {
    pub sensors: Vec<Sensor>,
    logic: Vec<LogicBlock>,
    pub controllers: Vec<ControllerBinding>,
    pub actuators: Vec<Actuator>,
    eval_order: Vec<usize>,
}

impl ControlSystem {
    pub fn new(
        sensors: Vec<Sensor>,
        logic: Vec<LogicBlock>,
        controllers: Vec<ControllerBinding>,
        actuators: Vec<Actuator>,
    ) -> ControlResult<Self> {
        // Reference validation up front; indices are stable afterwards.
        for (i, block) in logic.iter().enumerate() {
            for input in &block.inputs {
                match *input {
                    SignalRef::Sensor(s) if s >= sensors.len() => {
                        return Err(ControlError::InvalidReference {
                            what: format!("logic block '{}' reads missing sensor {s}", block.name),
                        });
                    }
                    SignalRef::Logic(l) if l >= logic.len() => {
                        return Err(ControlError::InvalidReference {
                            what: format!("logic block '{}' reads missing block {l}", block.name),
                        });
                    }
                    SignalRef::Logic(l) if l == i => {
                        return Err(ControlError::Topology {
                            what: format!("logic block '{}' reads itself", block.name),
                        });
                    }
                    _ => {}
                }
            }
        }
        for binding in &controllers {
            match binding.input {
                SignalRef::Sensor(s) if s >= sensors.len() => {
                    return Err(ControlError::InvalidReference {
                        what: format!("controller reads missing sensor {s}"),
                    });
                }
                SignalRef::Logic(l) if l >= logic.len() => {
                    return Err(ControlError::InvalidReference {
                        what: format!("controller reads missing logic block {l}"),
                    });
                }
                _ => {}
            }
            if binding.actuator >= actuators.len() {
                return Err(ControlError::InvalidReference {
                    what: format!("controller drives missing actuator {}", binding.actuator),
                });
            }
        }

        let eval_order = topological_order(&logic)?;

        Ok(Self {
            sensors,
            logic,
            controllers,
            actuators,
            eval_order,
        })
    }

    pub fn logic(&self) -> &[LogicBlock] {
        &self.logic
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    /// Run logic nodes and controllers for one step and return the actuator
    /// commands. Sensor readings must already be current.
    pub fn run_step(&mut self, dt: f64) -> Vec<ActuatorCommand> {
        // Logic pass in dependency order; stateful ops advance once.
        let mut logic_out = vec![0.0; self.logic.len()];
        let order = self.eval_order.clone();
        for &idx in &order {
            let inputs: Vec<f64> = self.logic[idx]
                .inputs
                .iter()
                .map(|r| self.signal_value(*r, &logic_out))
                .collect();
            logic_out[idx] = self.logic[idx].op.evaluate(&inputs);
            self.logic[idx].op.step(&inputs, dt);
        }

        // Controller pass.
        let mut commands = Vec::with_capacity(self.controllers.len());
        for binding in &mut self.controllers {
            let measurement = match binding.input {
                SignalRef::Sensor(s) => self.sensors[s].last_reading,
                SignalRef::Logic(l) => logic_out[l],
            };
            let (state, output) = binding.controller.update(&binding.state, measurement, dt);
            binding.state = state;
            self.actuators[binding.actuator].current_value = output;
            commands.push(ActuatorCommand {
                actuator: binding.actuator,
                value: output,
            });
        }
        commands
    }

    fn signal_value(&self, reference: SignalRef, logic_out: &[f64]) -> f64 {
        match reference {
            SignalRef::Sensor(s) => self.sensors[s].last_reading,
            SignalRef::Logic(l) => logic_out[l],
        }
    }
}

/// Kahn's algorithm over logic-to-logic edges.
fn topological_order(logic: &[LogicBlock]) -> ControlResult<Vec<usize>> {
    let n = logic.len();
    let mut in_degree = vec![0usize; n];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];

    for (i, block) in logic.iter().enumerate() {
        for input in &block.inputs {
            if let SignalRef::Logic(src) = *input {
                dependents[src].push(i);
                in_degree[i] += 1;
            }
        }
    }

    let mut queue: Vec<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);
    while let Some(i) = queue.pop() {
        order.push(i);
        for &dep in &dependents[i] {
            in_degree[dep] -= 1;
            if in_degree[dep] == 0 {
                queue.push(dep);
            }
        }
    }

    if order.len() != n {
        return Err(ControlError::Topology {
            what: "logic-node graph contains a cycle".into(),
        });
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::LogicOp;
    use crate::sensor::SensorKind;
    use mz_core::Id;

    fn pressure_sensor(name: &str) -> Sensor {
        Sensor::new(
            name,
            SensorKind::Pressure {
                node: Id::from_index(1),
            },
        )
    }

    fn damper_actuator() -> Actuator {
        Actuator::new(
            "damper",
            crate::ActuatorKind::DamperFraction,
            Id::from_index(0),
        )
    }

    #[test]
    fn sensor_to_controller_to_actuator() {
        let mut system = ControlSystem::new(
            vec![pressure_sensor("p")],
            vec![],
            vec![ControllerBinding {
                controller: PiController::with_limits(10.0, 0.1, 0.0, 0.0, 0.0, 1.0).unwrap(),
                state: PiState::default(),
                input: SignalRef::Sensor(0),
                actuator: 0,
            }],
            vec![damper_actuator()],
        )
        .unwrap();

        system.sensors[0].last_reading = 5.0;
        let commands = system.run_step(1.0);
        assert_eq!(commands.len(), 1);
        // error = 5, kp = 0.1 → 0.5
        assert!((commands[0].value - 0.5).abs() < 1e-12);
        assert!((system.actuators[0].current_value - 0.5).abs() < 1e-12);
    }

    #[test]
    fn logic_chain_evaluates_in_dependency_order() {
        // avg(s0, s1) -> not(avg)
        let mut system = ControlSystem::new(
            vec![pressure_sensor("a"), pressure_sensor("b")],
            vec![
                LogicBlock::new(
                    "avg",
                    LogicOp::Avg,
                    vec![SignalRef::Sensor(0), SignalRef::Sensor(1)],
                ),
                LogicBlock::new("not", LogicOp::Not, vec![SignalRef::Logic(0)]),
            ],
            vec![ControllerBinding {
                controller: PiController::with_limits(1.0, 1.0, 0.0, 0.0, 0.0, 1.0).unwrap(),
                state: PiState::default(),
                input: SignalRef::Logic(1),
                actuator: 0,
            }],
            vec![damper_actuator()],
        )
        .unwrap();

        system.sensors[0].last_reading = 0.8;
        system.sensors[1].last_reading = 0.6;
        // avg = 0.7 > 0.5 → not = 0 → error = 1 → out clamps to 1
        let commands = system.run_step(1.0);
        assert!((commands[0].value - 1.0).abs() < 1e-12);
    }

    #[test]
    fn cycle_is_rejected() {
        let result = ControlSystem::new(
            vec![],
            vec![
                LogicBlock::new("a", LogicOp::Abs, vec![SignalRef::Logic(1)]),
                LogicBlock::new("b", LogicOp::Abs, vec![SignalRef::Logic(0)]),
            ],
            vec![],
            vec![],
        );
        assert!(result.is_err());
    }

    #[test]
    fn dangling_references_rejected() {
        let result = ControlSystem::new(
            vec![],
            vec![LogicBlock::new("a", LogicOp::Abs, vec![SignalRef::Sensor(3)])],
            vec![],
            vec![],
        );
        assert!(result.is_err());

        let result = ControlSystem::new(
            vec![pressure_sensor("p")],
            vec![],
            vec![ControllerBinding {
                controller: PiController::new(0.0, 1.0, 0.0).unwrap(),
                state: PiState::default(),
                input: SignalRef::Sensor(0),
                actuator: 2,
            }],
            vec![],
        );
        assert!(result.is_err());
    }
}
