//! Running totals for a simulation world

use log::info;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimStats {
    pub ticks: u64,
    pub total_spawned: u64,
    pub total_arrived: u64,
    pub total_despawned: u64,
    /// Spawn attempts dropped because no route existed
    pub failed_spawns: u64,
    pub light_changes: u64,
}

impl SimStats {
    /// Share of finished cars that reached their destination, in percent
    pub fn success_rate(&self) -> f64 {
        let finished = self.total_arrived + self.total_despawned;
        if finished == 0 {
            0.0
        } else {
            self.total_arrived as f64 / finished as f64 * 100.0
        }
    }

    pub fn log_summary(&self, active_cars: usize) {
        info!("=== SIMULATION COMPLETE ===");
        info!("Ticks run: {}", self.ticks);
        info!("Total cars spawned: {}", self.total_spawned);
        info!("Total cars completed: {}", self.total_arrived);
        info!("Total cars despawned: {}", self.total_despawned);
        info!("Failed spawn attempts: {}", self.failed_spawns);
        info!("Traffic light phase changes: {}", self.light_changes);
        info!("Active cars: {}", active_cars);
        info!("Success rate: {:.1}%", self.success_rate());
    }
}
