use std::error::Error;

#[cfg(feature = "compile-shaders")]
fn main() -> Result<(), Box<dyn Error>> {
    use spirv_builder::{Capability, MetadataPrintout, SpirvBuilder};

    SpirvBuilder::new("./shaders/raytracing", "spirv-unknown-spv1.4")
        .capability(Capability::RayTracingKHR)
        .extension("SPV_KHR_ray_tracing")
        .print_metadata(MetadataPrintout::Full)
        .build()?;

    Ok(())
}

#[cfg(not(feature = "compile-shaders"))]
fn main() -> Result<(), Box<dyn Error>> {
    println!("cargo:rerun-if-changed=build.rs");
    Ok(())
}
