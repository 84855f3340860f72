pub mod planet;
pub mod ui;
