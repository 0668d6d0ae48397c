mod simulation_clock;

pub use simulation_clock::SimulationClock;
