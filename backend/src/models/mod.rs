mod container;

pub use container::ContainerSpec;
