//! Test doubles

use bot_bridge_core::{BotAction, BotControl};

/// Control loop stand-in that records every action it receives
#[derive(Debug, Default)]
pub struct RecordingControl {
    pub actions: Vec<BotAction>,
}

impl BotControl for RecordingControl {
    fn fire(&mut self, power: f64) {
        self.actions.push(BotAction::Fire { power });
    }

    fn forward(&mut self, distance: f64) {
        self.actions.push(BotAction::Forward { distance });
    }

    fn back(&mut self, distance: f64) {
        self.actions.push(BotAction::Back { distance });
    }

    fn turn_left(&mut self, angle: f64) {
        self.actions.push(BotAction::TurnLeft { angle });
    }

    fn turn_right(&mut self, angle: f64) {
        self.actions.push(BotAction::TurnRight { angle });
    }

    fn turn_gun_left(&mut self, angle: f64) {
        self.actions.push(BotAction::TurnGunLeft { angle });
    }

    fn turn_gun_right(&mut self, angle: f64) {
        self.actions.push(BotAction::TurnGunRight { angle });
    }

    fn turn_radar_left(&mut self, angle: f64) {
        self.actions.push(BotAction::TurnRadarLeft { angle });
    }

    fn turn_radar_right(&mut self, angle: f64) {
        self.actions.push(BotAction::TurnRadarRight { angle });
    }

    fn rescan(&mut self) {
        self.actions.push(BotAction::Rescan);
    }
}
