pub mod best_price;
pub mod data;
pub mod history;
pub mod line_board;
pub mod links;
pub mod movement;
pub mod normalizer;
pub mod snapshots;
pub mod trend;
