use crate::error::{Error, Result};
use crate::vulkan::instance::Instance;
use erupt::{vk, DeviceLoader, ExtendableFrom};
use gpu_alloc::{GpuAllocator, MemoryBlock, Request, UsageFlags};
use gpu_alloc_erupt::EruptMemoryDevice;
use parking_lot::Mutex;
use std::ffi::CStr;
use std::ops::Deref;
use std::os::raw::c_char;

pub const REQUIRED_EXTENSIONS: [*const c_char; 3] = [
    vk::KHR_ACCELERATION_STRUCTURE_EXTENSION_NAME,
    vk::KHR_RAY_TRACING_PIPELINE_EXTENSION_NAME,
    vk::KHR_DEFERRED_HOST_OPERATIONS_EXTENSION_NAME,
];

pub struct Device {
    handle: DeviceLoader,
    allocator: Mutex<GpuAllocator<vk::DeviceMemory>>,
    physical_device: vk::PhysicalDevice,
    queue_family_index: u32,
    queue: vk::Queue,
}

impl Deref for Device {
    type Target = DeviceLoader;

    fn deref(&self) -> &Self::Target {
        &self.handle
    }
}

impl Device {
    pub fn new(instance: &Instance) -> Result<Self> {
        let (physical_device, queue_family_index) = pick_physical_device(instance)?;
        let properties = unsafe { instance.get_physical_device_properties(physical_device) };
        log::info!("Using device {}", device_name(&properties));

        let queue_priorities = [1.0];
        let queue_create_infos = [vk::DeviceQueueCreateInfoBuilder::new()
            .queue_family_index(queue_family_index)
            .queue_priorities(&queue_priorities)];

        let mut vulkan12_features = vk::PhysicalDeviceVulkan12FeaturesBuilder::new()
            .buffer_device_address(true)
            .vulkan_memory_model(true);
        let mut vulkan13_features =
            vk::PhysicalDeviceVulkan13FeaturesBuilder::new().synchronization2(true);
        let mut acceleration_structure_features =
            vk::PhysicalDeviceAccelerationStructureFeaturesKHRBuilder::new()
                .acceleration_structure(true);
        let mut ray_tracing_features =
            vk::PhysicalDeviceRayTracingPipelineFeaturesKHRBuilder::new()
                .ray_tracing_pipeline(true);

        let device_create_info = vk::DeviceCreateInfoBuilder::new()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&REQUIRED_EXTENSIONS)
            .extend_from(&mut vulkan12_features)
            .extend_from(&mut vulkan13_features)
            .extend_from(&mut acceleration_structure_features)
            .extend_from(&mut ray_tracing_features);

        let handle = unsafe {
            DeviceLoader::new(instance.handle(), physical_device, &device_create_info)
        }
        .map_err(|err| Error::Loader(err.to_string()))?;

        let mut allocator_properties =
            unsafe { gpu_alloc_erupt::device_properties(instance.handle(), physical_device) }?;
        allocator_properties.buffer_device_address = true;
        let allocator = Mutex::new(GpuAllocator::new(
            gpu_alloc::Config::i_am_prototyping(),
            allocator_properties,
        ));

        let queue = unsafe { handle.get_device_queue(queue_family_index, 0) };

        Ok(Device {
            handle,
            allocator,
            physical_device,
            queue_family_index,
            queue,
        })
    }

    pub fn handle(&self) -> &DeviceLoader {
        &self.handle
    }

    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    pub fn queue_family_index(&self) -> u32 {
        self.queue_family_index
    }

    pub fn alloc_memory(
        &self,
        mem_reqs: vk::MemoryRequirements,
        usage: UsageFlags,
        min_alignment: u64,
    ) -> Result<MemoryBlock<vk::DeviceMemory>> {
        let alignment = mem_reqs.alignment.max(min_alignment).max(1);
        let block = unsafe {
            self.allocator.lock().alloc(
                EruptMemoryDevice::wrap(&self.handle),
                Request {
                    size: mem_reqs.size,
                    align_mask: alignment - 1,
                    usage,
                    memory_types: mem_reqs.memory_type_bits,
                },
            )
        }?;
        Ok(block)
    }

    pub fn dealloc_memory(&self, block: MemoryBlock<vk::DeviceMemory>) {
        unsafe {
            self.allocator
                .lock()
                .dealloc(EruptMemoryDevice::wrap(&self.handle), block);
        }
    }

    pub fn submit(
        &self,
        command_buffers: &[vk::CommandBuffer],
        fence: vk::Fence,
    ) -> Result<()> {
        let command_buffer_infos = command_buffers
            .iter()
            .map(|&command_buffer| {
                vk::CommandBufferSubmitInfoBuilder::new().command_buffer(command_buffer)
            })
            .collect::<Vec<_>>();
        let submit_info =
            [vk::SubmitInfo2Builder::new().command_buffer_infos(&command_buffer_infos)];

        unsafe {
            self.handle
                .queue_submit2(self.queue, &submit_info, fence)
                .result()?;
        }
        Ok(())
    }

    pub fn wait_idle(&self) -> Result<()> {
        unsafe { self.handle.device_wait_idle() }.result()?;
        Ok(())
    }

    pub fn destroy(&mut self) {
        log::debug!("Destroying device");
        unsafe {
            self.allocator
                .get_mut()
                .cleanup(EruptMemoryDevice::wrap(&self.handle));
            self.handle.destroy_device(None);
        }
    }
}

fn device_name(properties: &vk::PhysicalDeviceProperties) -> String {
    unsafe { CStr::from_ptr(properties.device_name.as_ptr()) }
        .to_string_lossy()
        .into_owned()
}

fn supports_extensions(instance: &Instance, physical_device: vk::PhysicalDevice) -> Result<bool> {
    let available = unsafe {
        instance.enumerate_device_extension_properties(physical_device, None, None)
    }
    .result()?;

    let missing = REQUIRED_EXTENSIONS.iter().find(|&&required| {
        let required = unsafe { CStr::from_ptr(required) };
        !available
            .iter()
            .any(|extension| unsafe { CStr::from_ptr(extension.extension_name.as_ptr()) } == required)
    });

    if let Some(&missing) = missing {
        log::debug!(
            "Device is missing {}",
            unsafe { CStr::from_ptr(missing) }.to_string_lossy()
        );
    }
    Ok(missing.is_none())
}

fn compute_queue_family(
    queue_family_properties: &[vk::QueueFamilyProperties],
) -> Option<u32> {
    queue_family_properties
        .iter()
        .position(|queue| queue.queue_flags.contains(vk::QueueFlags::COMPUTE))
        .map(|index| index as u32)
}

fn device_rank(device_type: vk::PhysicalDeviceType) -> u32 {
    match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => 0,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 1,
        vk::PhysicalDeviceType::VIRTUAL_GPU => 2,
        _ => 3,
    }
}

fn pick_physical_device(instance: &Instance) -> Result<(vk::PhysicalDevice, u32)> {
    let physical_devices = unsafe { instance.enumerate_physical_devices(None) }.result()?;

    let mut candidates = Vec::new();
    for physical_device in physical_devices {
        let properties = unsafe { instance.get_physical_device_properties(physical_device) };
        if properties.api_version < vk::API_VERSION_1_3 {
            log::debug!("Skipping {}: Vulkan 1.3 not supported", device_name(&properties));
            continue;
        }
        if !supports_extensions(instance, physical_device)? {
            log::debug!("Skipping {}: no ray tracing support", device_name(&properties));
            continue;
        }
        let queue_family_properties = unsafe {
            instance.get_physical_device_queue_family_properties(physical_device, None)
        };
        if let Some(queue_family_index) = compute_queue_family(&queue_family_properties) {
            candidates.push((properties.device_type, (physical_device, queue_family_index)));
        }
    }

    preferred(candidates).ok_or(Error::NoSuitableDevice)
}

/// Best ranked candidate. Equally ranked candidates keep enumeration order.
fn preferred<T>(candidates: Vec<(vk::PhysicalDeviceType, T)>) -> Option<T> {
    candidates
        .into_iter()
        .min_by_key(|(device_type, _)| device_rank(*device_type))
        .map(|(_, candidate)| candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_first_compute_family() {
        let families = [
            vk::QueueFamilyProperties {
                queue_flags: vk::QueueFlags::TRANSFER,
                ..Default::default()
            },
            vk::QueueFamilyProperties {
                queue_flags: vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE,
                ..Default::default()
            },
            vk::QueueFamilyProperties {
                queue_flags: vk::QueueFlags::COMPUTE,
                ..Default::default()
            },
        ];
        assert_eq!(compute_queue_family(&families), Some(1));
        assert_eq!(compute_queue_family(&families[..1]), None);
    }

    #[test]
    fn discrete_gpus_rank_first() {
        assert!(
            device_rank(vk::PhysicalDeviceType::DISCRETE_GPU)
                < device_rank(vk::PhysicalDeviceType::INTEGRATED_GPU)
        );
        assert!(
            device_rank(vk::PhysicalDeviceType::INTEGRATED_GPU)
                < device_rank(vk::PhysicalDeviceType::CPU)
        );
    }

    #[test]
    fn prefers_discrete_then_enumeration_order() {
        use vk::PhysicalDeviceType as Type;
        assert_eq!(
            preferred(vec![(Type::INTEGRATED_GPU, 0), (Type::DISCRETE_GPU, 1), (Type::DISCRETE_GPU, 2)]),
            Some(1)
        );
        assert_eq!(
            preferred(vec![(Type::CPU, 0), (Type::INTEGRATED_GPU, 1), (Type::INTEGRATED_GPU, 2)]),
            Some(1)
        );
        assert_eq!(preferred::<u32>(vec![]), None);
    }
}
