//! Stand-in bot for dry runs
//!
//! Integrates commands into position, headings and energy so the tick records a
//! script sees actually change. One stationary opponent sits in the arena for
//! the radar to find.

use bot_bridge_core::{BotControl, EventRecord};

pub const ARENA_WIDTH: f64 = 800.0;
pub const ARENA_HEIGHT: f64 = 600.0;

const BOT_RADIUS: f64 = 18.0;
const START_ENERGY: f64 = 100.0;
const GUN_COOLING_RATE: f64 = 0.1;
const RADAR_HALF_ARC: f64 = 22.5;
const OPPONENT: (f64, f64) = (600.0, 450.0);
const OPPONENT_ENERGY: f64 = 100.0;

#[derive(Debug, Clone)]
pub struct HarnessBot {
    pub x: f64,
    pub y: f64,
    pub energy: f64,
    pub direction: f64,
    pub gun_direction: f64,
    pub radar_direction: f64,
    pub gun_heat: f64,
    speed: f64,
    rescan: bool,
    pending: Vec<EventRecord>,
}

impl Default for HarnessBot {
    fn default() -> Self {
        Self {
            x: ARENA_WIDTH / 2.0,
            y: ARENA_HEIGHT / 2.0,
            energy: START_ENERGY,
            direction: 0.0,
            gun_direction: 0.0,
            radar_direction: 0.0,
            gun_heat: 0.0,
            speed: 0.0,
            rescan: false,
            pending: Vec::new(),
        }
    }
}

impl HarnessBot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_disabled(&self) -> bool {
        self.energy <= 0.0
    }

    /// Close out a turn: cool the gun, then report what happened
    /// followed by the tick snapshot
    pub fn advance(&mut self, turn: u32) -> Vec<EventRecord> {
        self.gun_heat = (self.gun_heat - GUN_COOLING_RATE).max(0.0);

        let mut events = std::mem::take(&mut self.pending);
        if let Some(scan) = self.scan() {
            events.push(scan);
        }
        events.push(EventRecord::Tick {
            turn,
            energy: self.energy,
            x: self.x,
            y: self.y,
            direction: self.direction,
            gun_direction: self.gun_direction,
            radar_direction: self.radar_direction,
            gun_heat: self.gun_heat,
            speed: self.speed,
        });
        self.speed = 0.0;
        events
    }

    fn scan(&mut self) -> Option<EventRecord> {
        let (ox, oy) = OPPONENT;
        let bearing = heading_to(ox - self.x, oy - self.y);
        let in_arc = angle_between(self.radar_direction, bearing) <= RADAR_HALF_ARC;
        if !(in_arc || std::mem::take(&mut self.rescan)) {
            return None;
        }
        Some(EventRecord::ScannedBot {
            distance: (ox - self.x).hypot(oy - self.y),
            energy: OPPONENT_ENERGY,
            x: ox,
            y: oy,
            direction: 0.0,
            speed: 0.0,
        })
    }

    fn travel(&mut self, distance: f64) {
        let rad = self.direction.to_radians();
        let tx = self.x + rad.sin() * distance;
        let ty = self.y + rad.cos() * distance;
        self.x = tx.clamp(BOT_RADIUS, ARENA_WIDTH - BOT_RADIUS);
        self.y = ty.clamp(BOT_RADIUS, ARENA_HEIGHT - BOT_RADIUS);
        self.speed = distance;
        if self.x != tx || self.y != ty {
            self.pending.push(EventRecord::HitWall);
        }
    }
}

impl BotControl for HarnessBot {
    fn fire(&mut self, power: f64) {
        if self.gun_heat > 0.0 || self.is_disabled() {
            return;
        }
        let power = power.clamp(0.1, 3.0).min(self.energy);
        self.energy -= power;
        self.gun_heat = 1.0 + power / 5.0;
        // Nothing to hit but walls
        self.pending.push(EventRecord::BulletHitWall);
    }

    fn forward(&mut self, distance: f64) {
        self.travel(distance);
    }

    fn back(&mut self, distance: f64) {
        self.travel(-distance);
    }

    fn turn_left(&mut self, angle: f64) {
        self.direction = normalize(self.direction - angle);
    }

    fn turn_right(&mut self, angle: f64) {
        self.direction = normalize(self.direction + angle);
    }

    fn turn_gun_left(&mut self, angle: f64) {
        self.gun_direction = normalize(self.gun_direction - angle);
    }

    fn turn_gun_right(&mut self, angle: f64) {
        self.gun_direction = normalize(self.gun_direction + angle);
    }

    fn turn_radar_left(&mut self, angle: f64) {
        self.radar_direction = normalize(self.radar_direction - angle);
    }

    fn turn_radar_right(&mut self, angle: f64) {
        self.radar_direction = normalize(self.radar_direction + angle);
    }

    fn rescan(&mut self) {
        self.rescan = true;
    }
}

/// Degrees in `[0, 360)`, 0 = north, clockwise
fn normalize(degrees: f64) -> f64 {
    degrees.rem_euclid(360.0)
}

fn heading_to(dx: f64, dy: f64) -> f64 {
    normalize(dx.atan2(dy).to_degrees())
}

fn angle_between(a: f64, b: f64) -> f64 {
    let diff = normalize(a - b);
    diff.min(360.0 - diff)
}
