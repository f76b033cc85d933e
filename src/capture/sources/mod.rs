//! Platform capture providers.

pub mod hyprland;
