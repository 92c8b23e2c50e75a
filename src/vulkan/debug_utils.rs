use crate::error::Result;
use crate::vulkan::instance::Instance;
use erupt::{cstr, vk};
use std::ffi::{c_void, CStr};
use std::os::raw::c_char;

pub const VALIDATION_LAYER: *const c_char = cstr!("VK_LAYER_KHRONOS_validation");

/// Forwards validation layer output into `log`.
pub struct DebugMessenger {
    handle: vk::DebugUtilsMessengerEXT,
}

impl DebugMessenger {
    pub fn new(instance: &Instance) -> Result<Self> {
        let handle = if instance.validation_enabled() {
            log::debug!("Enabling debug messenger");
            let messenger_info = vk::DebugUtilsMessengerCreateInfoEXTBuilder::new()
                .message_severity(
                    vk::DebugUtilsMessageSeverityFlagsEXT::INFO_EXT
                        | vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE_EXT
                        | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING_EXT
                        | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR_EXT,
                )
                .message_type(
                    vk::DebugUtilsMessageTypeFlagsEXT::GENERAL_EXT
                        | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION_EXT
                        | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE_EXT,
                )
                .pfn_user_callback(Some(debug_callback));

            unsafe {
                instance
                    .create_debug_utils_messenger_ext(&messenger_info, None)
                    .result()?
            }
        } else {
            vk::DebugUtilsMessengerEXT::null()
        };

        Ok(DebugMessenger { handle })
    }

    pub fn destroy(&mut self, instance: &Instance) {
        if !self.handle.is_null() {
            unsafe {
                instance.destroy_debug_utils_messenger_ext(self.handle, None);
            }
            self.handle = vk::DebugUtilsMessengerEXT::null();
        }
    }
}

unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagBitsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _p_user_data: *mut c_void,
) -> vk::Bool32 {
    let types = match message_type {
        vk::DebugUtilsMessageTypeFlagsEXT::GENERAL_EXT => "[General]",
        vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE_EXT => "[Performance]",
        vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION_EXT => "[Validation]",
        _ => "[Unknown]",
    };
    let message = CStr::from_ptr((*p_callback_data).p_message).to_string_lossy();

    log::log!(message_level(message_severity), "{} {}", types, message);

    vk::FALSE
}

fn message_level(severity: vk::DebugUtilsMessageSeverityFlagBitsEXT) -> log::Level {
    match severity {
        vk::DebugUtilsMessageSeverityFlagBitsEXT::VERBOSE_EXT => log::Level::Trace,
        vk::DebugUtilsMessageSeverityFlagBitsEXT::INFO_EXT => log::Level::Info,
        vk::DebugUtilsMessageSeverityFlagBitsEXT::ERROR_EXT => log::Level::Error,
        _ => log::Level::Warn,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severities_map_to_log_levels() {
        use vk::DebugUtilsMessageSeverityFlagBitsEXT as Severity;
        assert_eq!(message_level(Severity::VERBOSE_EXT), log::Level::Trace);
        assert_eq!(message_level(Severity::INFO_EXT), log::Level::Info);
        assert_eq!(message_level(Severity::WARNING_EXT), log::Level::Warn);
        assert_eq!(message_level(Severity::ERROR_EXT), log::Level::Error);
    }
}
