//! Commands received from the peer and the actions they map to

use crate::control::BotControl;
use std::fmt;

/// The fixed command vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Fire,
    Forward,
    Back,
    TurnLeft,
    TurnRight,
    TurnGunLeft,
    TurnGunRight,
    TurnRadarLeft,
    TurnRadarRight,
    Rescan,
}

/// Which record field a command reads its parameter from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKey {
    Power,
    Distance,
    Angle,
}

impl CommandKind {
    pub const ALL: [CommandKind; 10] = [
        CommandKind::Fire,
        CommandKind::Forward,
        CommandKind::Back,
        CommandKind::TurnLeft,
        CommandKind::TurnRight,
        CommandKind::TurnGunLeft,
        CommandKind::TurnGunRight,
        CommandKind::TurnRadarLeft,
        CommandKind::TurnRadarRight,
        CommandKind::Rescan,
    ];

    /// Look up a command by its wire name (case-sensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Wire name
    pub fn name(self) -> &'static str {
        match self {
            CommandKind::Fire => "fire",
            CommandKind::Forward => "forward",
            CommandKind::Back => "back",
            CommandKind::TurnLeft => "turnLeft",
            CommandKind::TurnRight => "turnRight",
            CommandKind::TurnGunLeft => "turnGunLeft",
            CommandKind::TurnGunRight => "turnGunRight",
            CommandKind::TurnRadarLeft => "turnRadarLeft",
            CommandKind::TurnRadarRight => "turnRadarRight",
            CommandKind::Rescan => "rescan",
        }
    }

    /// Parameter this command consumes, `None` for `rescan`
    pub fn param_key(self) -> Option<ParamKey> {
        match self {
            CommandKind::Fire => Some(ParamKey::Power),
            CommandKind::Forward | CommandKind::Back => Some(ParamKey::Distance),
            CommandKind::TurnLeft
            | CommandKind::TurnRight
            | CommandKind::TurnGunLeft
            | CommandKind::TurnGunRight
            | CommandKind::TurnRadarLeft
            | CommandKind::TurnRadarRight => Some(ParamKey::Angle),
            CommandKind::Rescan => None,
        }
    }

    /// Build the action for this command with an already-selected parameter
    pub fn action(self, value: f64) -> BotAction {
        match self {
            CommandKind::Fire => BotAction::Fire { power: value },
            CommandKind::Forward => BotAction::Forward { distance: value },
            CommandKind::Back => BotAction::Back { distance: value },
            CommandKind::TurnLeft => BotAction::TurnLeft { angle: value },
            CommandKind::TurnRight => BotAction::TurnRight { angle: value },
            CommandKind::TurnGunLeft => BotAction::TurnGunLeft { angle: value },
            CommandKind::TurnGunRight => BotAction::TurnGunRight { angle: value },
            CommandKind::TurnRadarLeft => BotAction::TurnRadarLeft { angle: value },
            CommandKind::TurnRadarRight => BotAction::TurnRadarRight { angle: value },
            CommandKind::Rescan => BotAction::Rescan,
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a command line was written by the peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordForm {
    /// `{cmd: "forward", distance: 100}`
    Structured,
    /// `forward 100`
    Fallback,
}

/// A decoded command line
///
/// `name` is kept as the raw string so that names outside the vocabulary
/// still reach the dispatcher, which reports them as unknown.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandRecord {
    pub name: String,
    pub power: f64,
    pub distance: f64,
    pub angle: f64,
    pub form: RecordForm,
}

impl CommandRecord {
    /// Structured record with per-key parameters
    pub fn structured(name: impl Into<String>, power: f64, distance: f64, angle: f64) -> Self {
        Self {
            name: name.into(),
            power,
            distance,
            angle,
            form: RecordForm::Structured,
        }
    }

    /// Fallback record: the single parameter applies to every key
    pub fn fallback(name: impl Into<String>, parameter: f64) -> Self {
        Self {
            name: name.into(),
            power: parameter,
            distance: parameter,
            angle: parameter,
            form: RecordForm::Fallback,
        }
    }

    /// Command kind, `None` if the name is outside the vocabulary
    pub fn kind(&self) -> Option<CommandKind> {
        CommandKind::from_name(&self.name)
    }

    /// Value for the given parameter key
    pub fn param(&self, key: ParamKey) -> f64 {
        match key {
            ParamKey::Power => self.power,
            ParamKey::Distance => self.distance,
            ParamKey::Angle => self.angle,
        }
    }
}

/// A control-loop action with its validated parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BotAction {
    Fire { power: f64 },
    Forward { distance: f64 },
    Back { distance: f64 },
    TurnLeft { angle: f64 },
    TurnRight { angle: f64 },
    TurnGunLeft { angle: f64 },
    TurnGunRight { angle: f64 },
    TurnRadarLeft { angle: f64 },
    TurnRadarRight { angle: f64 },
    Rescan,
}

impl BotAction {
    /// Execute against the control loop
    pub fn apply(self, control: &mut dyn BotControl) {
        match self {
            BotAction::Fire { power } => control.fire(power),
            BotAction::Forward { distance } => control.forward(distance),
            BotAction::Back { distance } => control.back(distance),
            BotAction::TurnLeft { angle } => control.turn_left(angle),
            BotAction::TurnRight { angle } => control.turn_right(angle),
            BotAction::TurnGunLeft { angle } => control.turn_gun_left(angle),
            BotAction::TurnGunRight { angle } => control.turn_gun_right(angle),
            BotAction::TurnRadarLeft { angle } => control.turn_radar_left(angle),
            BotAction::TurnRadarRight { angle } => control.turn_radar_right(angle),
            BotAction::Rescan => control.rescan(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip_through_lookup() {
        for kind in CommandKind::ALL {
            assert_eq!(CommandKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(CommandKind::from_name("Forward"), None);
        assert_eq!(CommandKind::from_name("turn"), None);
    }

    #[test]
    fn test_fallback_parameter_is_uniform() {
        let record = CommandRecord::fallback("turnGunLeft", 45.0);
        assert_eq!(record.kind(), Some(CommandKind::TurnGunLeft));
        assert_eq!(record.param(ParamKey::Power), 45.0);
        assert_eq!(record.param(ParamKey::Distance), 45.0);
        assert_eq!(record.param(ParamKey::Angle), 45.0);
    }

    #[test]
    fn test_param_keys() {
        assert_eq!(CommandKind::Fire.param_key(), Some(ParamKey::Power));
        assert_eq!(CommandKind::Back.param_key(), Some(ParamKey::Distance));
        assert_eq!(CommandKind::TurnRadarRight.param_key(), Some(ParamKey::Angle));
        assert_eq!(CommandKind::Rescan.param_key(), None);
    }
}
