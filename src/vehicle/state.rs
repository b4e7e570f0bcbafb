use super::DriveCommand;
use crate::math::{clamp01, lerp};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Blend times shorter than this brake at full strength straight away, in s.
const MIN_BLEND: f64 = 1e-3; // s

/// Who, or what, is driving a vehicle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DriveState {
    /// The AI driver writes the drive command.
    AiControlled,
    /// The player's input is polled for the drive command.
    PlayerControlled,
    /// Nobody drives; the vehicle brakes until it comes to rest.
    BrakingToStop {
        /// The time since braking began, in s.
        elapsed: f64,
        /// The full braking command, in [0, 1].
        strength: f64,
        /// The time over which the brake ramps up to full strength, in s.
        blend: f64,
        /// If set, the vehicle parks after braking for this long, in s.
        deadline: Option<f64>,
    },
    /// Nobody drives and the inputs are neutral.
    Parked,
}

/// The attributes of a vehicle's driver state machine.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DriverStateAttributes {
    /// The time the brake takes to ramp up after the driver is killed, in s.
    pub stop_blend_seconds: f64,
    /// The brake command applied after the driver is killed, in [0, 1].
    pub brake_strength: f64,
    /// The vehicle parks once slower than this, in m/s.
    pub stop_threshold: f64,
    /// Whether the player may take over the vehicle.
    pub allow_player_takeover: bool,
    /// The player may only get in below this speed, in m/s.
    pub max_enter_speed: f64,
    /// The player may only get out below this speed, in m/s.
    pub max_exit_speed: f64,
    /// The brake command applied after the player gets out, in [0, 1].
    pub post_exit_brake: f64,
    /// The longest the vehicle brakes after the player gets out, in s.
    pub max_exit_brake_time: f64,
    /// The damage the AI driver withstands.
    pub driver_health: f64,
}

impl Default for DriverStateAttributes {
    fn default() -> Self {
        Self {
            stop_blend_seconds: 1.0,
            brake_strength: 0.75,
            stop_threshold: 0.25,
            allow_player_takeover: true,
            max_enter_speed: 1.5,
            max_exit_speed: 1.0,
            post_exit_brake: 0.6,
            max_exit_brake_time: 1.25,
            driver_health: 1.0,
        }
    }
}

/// Decides who may write a vehicle's drive command.
///
/// Once the player has taken over, only [DriverState::re_enable_ai] hands control back
/// to the AI driver.
#[derive(Clone, Debug)]
pub struct DriverState {
    attributes: DriverStateAttributes,
    state: DriveState,
    has_ai: bool,
    health: f64,
}

impl DriverState {
    /// Creates the state machine. Vehicles without an AI driver start parked.
    pub fn new(attributes: &DriverStateAttributes, has_ai: bool) -> Self {
        let mut attributes = *attributes;
        attributes.brake_strength = clamp01(attributes.brake_strength);
        attributes.post_exit_brake = clamp01(attributes.post_exit_brake);
        attributes.stop_threshold = f64::max(attributes.stop_threshold, 0.0);
        Self {
            state: if has_ai {
                DriveState::AiControlled
            } else {
                DriveState::Parked
            },
            has_ai,
            health: attributes.driver_health,
            attributes,
        }
    }

    pub fn attributes(&self) -> &DriverStateAttributes {
        &self.attributes
    }

    pub fn state(&self) -> DriveState {
        self.state
    }

    /// Whether the AI driver is alive and driving.
    pub fn is_ai_driving(&self) -> bool {
        self.state == DriveState::AiControlled
    }

    pub fn is_player_driving(&self) -> bool {
        self.state == DriveState::PlayerControlled
    }

    /// The AI driver's remaining health.
    pub fn health(&self) -> f64 {
        self.health
    }

    /// Kills the AI driver, who stops driving and brakes to a halt.
    /// Returns `false` if the AI was not driving.
    pub fn on_driver_killed(&mut self) -> bool {
        if !self.is_ai_driving() {
            return false;
        }
        self.health = 0.0;
        self.brake_to_stop();
        true
    }

    /// Switches the AI driver off, leaving the vehicle to brake to a halt.
    /// The driver keeps their health. Returns `false` if the AI was not driving.
    pub fn on_ai_disabled(&mut self) -> bool {
        if !self.is_ai_driving() {
            return false;
        }
        self.brake_to_stop();
        true
    }

    fn brake_to_stop(&mut self) {
        self.transition(DriveState::BrakingToStop {
            elapsed: 0.0,
            strength: self.attributes.brake_strength,
            blend: self.attributes.stop_blend_seconds,
            deadline: None,
        });
    }

    /// Damages the AI driver. Returns `true` if this killed them.
    pub fn damage(&mut self, amount: f64) -> bool {
        if !self.is_ai_driving() || amount <= 0.0 {
            return false;
        }
        self.health -= amount;
        self.health <= 0.0 && self.on_driver_killed()
    }

    /// Hands control to the player. Only possible while nobody drives and
    /// the vehicle is nearly at rest.
    pub fn enter_as_player(&mut self, speed: f64) -> bool {
        if !self.attributes.allow_player_takeover {
            return false;
        }
        if !matches!(self.state, DriveState::BrakingToStop { .. } | DriveState::Parked) {
            return false;
        }
        if speed.abs() > self.attributes.max_enter_speed {
            return false;
        }
        self.transition(DriveState::PlayerControlled);
        true
    }

    /// Takes control from the player, who must have nearly stopped.
    /// The vehicle then brakes briefly before parking.
    pub fn exit_as_player(&mut self, speed: f64) -> bool {
        if !self.is_player_driving() || speed.abs() > self.attributes.max_exit_speed {
            return false;
        }
        self.transition(DriveState::BrakingToStop {
            elapsed: 0.0,
            strength: self.attributes.post_exit_brake,
            blend: 0.0,
            deadline: Some(self.attributes.max_exit_brake_time),
        });
        true
    }

    /// Revives the AI driver and hands control back to them.
    /// Returns `false` if the vehicle has no AI driver.
    pub fn re_enable_ai(&mut self) -> bool {
        if !self.has_ai {
            log::warn!("cannot re-enable AI on a vehicle without an AI driver");
            return false;
        }
        self.health = self.attributes.driver_health;
        self.transition(DriveState::AiControlled);
        true
    }

    /// Advances the braking sequence.
    ///
    /// Returns the command to write while braking or parked, or `None` while
    /// the AI or the player drives.
    pub fn tick(&mut self, dt: f64, forward_speed: f64) -> Option<DriveCommand> {
        let threshold = self.attributes.stop_threshold;
        match &mut self.state {
            DriveState::BrakingToStop {
                elapsed,
                strength,
                blend,
                deadline,
            } => {
                let t = if *blend < MIN_BLEND {
                    1.0
                } else {
                    clamp01(*elapsed / *blend)
                };
                let brake = lerp(0.0, -*strength, t);
                *elapsed += dt;

                let timed_out = deadline.map_or(false, |deadline| *elapsed >= deadline);
                if forward_speed.abs() <= threshold || timed_out {
                    self.transition(DriveState::Parked);
                    return Some(DriveCommand::NEUTRAL);
                }

                let throttle = if forward_speed > 0.0 { brake } else { 0.0 };
                Some(DriveCommand::new(throttle, 0.0))
            }
            DriveState::Parked => Some(DriveCommand::NEUTRAL),
            DriveState::AiControlled | DriveState::PlayerControlled => None,
        }
    }

    fn transition(&mut self, state: DriveState) {
        log::debug!("driver state {:?} -> {:?}", self.state, state);
        self.state = state;
    }
}
