pub mod acceleration_structure;
pub mod bottom_level_acceleration_structure;
pub mod bottom_level_geometry;
pub mod raytracing_pipeline;
pub mod raytracing_properties;
pub mod shader_binding_table;
pub mod top_level_acceleration_structure;
