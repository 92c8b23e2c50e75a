use crate::error::{Error, Result};
use crate::vulkan::debug_utils;
use erupt::extensions::ext_debug_utils;
use erupt::{vk, EntryLoader, InstanceLoader};
use std::ffi::{CStr, CString};
use std::ops::Deref;

pub struct Instance {
    handle: InstanceLoader,
    _entry: EntryLoader,
    validation_enabled: bool,
}

impl Deref for Instance {
    type Target = InstanceLoader;

    fn deref(&self) -> &Self::Target {
        &self.handle
    }
}

impl Instance {
    pub fn handle(&self) -> &InstanceLoader {
        &self.handle
    }

    pub fn validation_enabled(&self) -> bool {
        self.validation_enabled
    }

    pub fn new() -> Result<Self> {
        let entry = EntryLoader::new().map_err(|err| Error::Loader(err.to_string()))?;

        let validation_enabled = cfg!(debug_assertions) && validation_layer_available(&entry);
        if cfg!(debug_assertions) && !validation_enabled {
            log::warn!("Validation layer requested but not installed");
        }

        let instance = create_instance(&entry, validation_enabled)?;
        Ok(Instance {
            handle: instance,
            _entry: entry,
            validation_enabled,
        })
    }

    pub fn destroy(&mut self) {
        log::debug!("Destroying instance");
        unsafe {
            self.handle.destroy_instance(None);
        }
    }
}

fn validation_layer_available(entry: &EntryLoader) -> bool {
    let layers = match unsafe { entry.enumerate_instance_layer_properties(None) }.result() {
        Ok(layers) => layers,
        Err(_) => return false,
    };
    let wanted = unsafe { CStr::from_ptr(debug_utils::VALIDATION_LAYER) };
    layers
        .iter()
        .any(|layer| unsafe { CStr::from_ptr(layer.layer_name.as_ptr()) } == wanted)
}

fn create_instance(entry: &EntryLoader, validation_enabled: bool) -> Result<InstanceLoader> {
    let app_name = CString::new("rtengine").map_err(|err| Error::Loader(err.to_string()))?;
    let engine_name = CString::new("rtengine").map_err(|err| Error::Loader(err.to_string()))?;
    let app_info = vk::ApplicationInfoBuilder::new()
        .api_version(vk::API_VERSION_1_3)
        .application_version(vk::make_api_version(0, 0, 1, 0))
        .application_name(&app_name)
        .engine_version(vk::make_api_version(0, 0, 1, 0))
        .engine_name(&engine_name);

    let mut instance_extensions = Vec::new();
    let mut instance_layers = Vec::new();
    if validation_enabled {
        instance_extensions.push(ext_debug_utils::EXT_DEBUG_UTILS_EXTENSION_NAME);
        instance_layers.push(debug_utils::VALIDATION_LAYER);
    }

    let instance_info = vk::InstanceCreateInfoBuilder::new()
        .application_info(&app_info)
        .enabled_extension_names(&instance_extensions)
        .enabled_layer_names(&instance_layers);

    unsafe { InstanceLoader::new(entry, &instance_info) }
        .map_err(|err| Error::Loader(err.to_string()))
}
