use crate::error::{Error, Result};
use crate::vulkan::device::Device;
use erupt::vk;
use std::ffi::CStr;
use std::path::Path;

#[cfg(feature = "compile-shaders")]
const RAYTRACING_BYTES: &[u8] = include_bytes!(env!("raytracing.spv"));

pub struct ShaderModule {
    handle: vk::ShaderModule,
}

impl ShaderModule {
    /// Uses the module built alongside the crate when available, otherwise
    /// reads SPIR-V from `path`.
    pub fn raytracing(device: &Device, path: &Path) -> Result<Self> {
        #[cfg(feature = "compile-shaders")]
        {
            let _ = path;
            log::debug!("Using built-in ray tracing shaders");
            Self::from_bytes(device, RAYTRACING_BYTES, Path::new("raytracing.spv"))
        }
        #[cfg(not(feature = "compile-shaders"))]
        {
            log::debug!("Loading ray tracing shaders from {}", path.display());
            let bytes = read_spirv(path)?;
            Self::from_bytes(device, &bytes, path)
        }
    }

    fn from_bytes(device: &Device, bytes: &[u8], origin: &Path) -> Result<Self> {
        let code = decode(bytes, origin)?;
        let module_info = vk::ShaderModuleCreateInfoBuilder::new().code(&code);
        let handle = unsafe { device.handle().create_shader_module(&module_info, None) }.result()?;

        Ok(ShaderModule { handle })
    }

    pub fn destroy(&self, device: &Device) {
        unsafe {
            device.handle().destroy_shader_module(self.handle, None);
        }
    }

    pub fn handle(&self) -> vk::ShaderModule {
        self.handle
    }

    pub fn shader_stage<'a>(
        &self,
        stage: vk::ShaderStageFlagBits,
        entry_point: &'a CStr,
    ) -> vk::PipelineShaderStageCreateInfoBuilder<'a> {
        vk::PipelineShaderStageCreateInfoBuilder::new()
            .stage(stage)
            .module(self.handle)
            .name(entry_point)
    }
}

#[cfg(not(feature = "compile-shaders"))]
fn read_spirv(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|err| {
        let reason = if err.kind() == std::io::ErrorKind::NotFound {
            format!(
                "{}; build with `--features compile-shaders` to embed the shaders, \
                 or set `shader_path` to a compiled module",
                err
            )
        } else {
            err.to_string()
        };
        Error::Shader {
            path: path.to_path_buf(),
            reason,
        }
    })
}

fn decode(bytes: &[u8], origin: &Path) -> Result<Vec<u32>> {
    erupt::utils::decode_spv(bytes).map_err(|err| Error::Shader {
        path: origin.to_path_buf(),
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_spirv_words() {
        let mut bytes = 0x0723_0203u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&0x0001_0400u32.to_le_bytes());
        let words = decode(&bytes, Path::new("inline")).unwrap();
        assert_eq!(words, vec![0x0723_0203, 0x0001_0400]);
    }

    #[test]
    #[cfg(not(feature = "compile-shaders"))]
    fn missing_module_points_at_the_build_feature() {
        let path = std::env::temp_dir().join("rtengine-missing-shader.spv");
        match read_spirv(&path) {
            Err(Error::Shader { reason, .. }) => assert!(reason.contains("compile-shaders")),
            _ => panic!("expected a shader error"),
        }
    }

    #[test]
    #[cfg(not(feature = "compile-shaders"))]
    fn reads_module_from_disk() {
        let path = std::env::temp_dir().join(format!("rtengine-shader-{}.spv", std::process::id()));
        std::fs::write(&path, 0x0723_0203u32.to_le_bytes()).unwrap();
        let bytes = read_spirv(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(decode(&bytes, &path).unwrap(), vec![0x0723_0203]);
    }

    #[test]
    fn rejects_truncated_spirv() {
        let result = decode(&[0x03, 0x02, 0x23], Path::new("broken.spv"));
        assert!(matches!(result, Err(Error::Shader { .. })));
    }
}
