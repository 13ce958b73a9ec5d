pub mod composite;
pub mod compositor;
