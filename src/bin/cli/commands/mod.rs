pub mod direction;
pub mod due;
pub mod migrate;
pub mod practice;
pub mod stats;
pub mod transfer;
