//! Timeline model: items, lanes, placement and splitting.

pub mod item;
pub mod lane;
pub mod overlap;
pub mod split;
