//! Host boundary exposed by the simulation engine

/// Actions the bridge may drive on the control loop
///
/// Implementations are usually thin handles onto the engine. In the
/// asynchronous discipline they are called from the bridge's reader task,
/// hence `Send`.
pub trait BotControl: Send {
    fn fire(&mut self, power: f64);

    fn forward(&mut self, distance: f64);

    fn back(&mut self, distance: f64);

    fn turn_left(&mut self, angle: f64);

    fn turn_right(&mut self, angle: f64);

    fn turn_gun_left(&mut self, angle: f64);

    fn turn_gun_right(&mut self, angle: f64);

    fn turn_radar_left(&mut self, angle: f64);

    fn turn_radar_right(&mut self, angle: f64);

    fn rescan(&mut self);
}
