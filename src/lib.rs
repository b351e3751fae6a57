//! Traffic Simulation Library
//!
//! Cars drive shortest routes across a road network on a fixed tick, and
//! every tick's positions are streamed to subscribed observers.

pub mod simulation;
