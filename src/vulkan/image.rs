use crate::error::Result;
use crate::vulkan::device::Device;
use crate::vulkan::device_memory::DeviceMemory;
use erupt::vk;

pub struct Image {
    handle: vk::Image,
    view: vk::ImageView,
    device_memory: DeviceMemory,
    extent: vk::Extent2D,
}

impl Image {
    pub fn new(
        device: &Device,
        extent: vk::Extent2D,
        format: vk::Format,
        tiling: vk::ImageTiling,
        usage: vk::ImageUsageFlags,
        aspect_flags: vk::ImageAspectFlags,
    ) -> Result<Self> {
        let create_info = vk::ImageCreateInfoBuilder::new()
            .image_type(vk::ImageType::_2D)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .format(format)
            .tiling(tiling)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .samples(vk::SampleCountFlagBits::_1);

        let handle = unsafe { device.create_image(&create_info, None) }.result()?;

        let mem_reqs = unsafe { device.get_image_memory_requirements(handle) };
        let device_memory = DeviceMemory::new(
            device,
            mem_reqs,
            gpu_alloc::UsageFlags::FAST_DEVICE_ACCESS,
            1,
        )?;
        device_memory.bind_to_image(device, handle)?;

        let view_info = vk::ImageViewCreateInfoBuilder::new()
            .image(handle)
            .view_type(vk::ImageViewType::_2D)
            .format(format)
            .subresource_range(subresource_range(aspect_flags));
        let view = unsafe { device.create_image_view(&view_info, None) }.result()?;

        Ok(Image {
            handle,
            view,
            device_memory,
            extent,
        })
    }

    pub fn handle(&self) -> vk::Image {
        self.handle
    }

    pub fn view(&self) -> vk::ImageView {
        self.view
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Tightly packed size of the image in bytes for a 4 byte per texel format.
    pub fn byte_size(&self) -> u64 {
        self.extent.width as u64 * self.extent.height as u64 * 4
    }

    pub fn destroy(&mut self, device: &Device) {
        unsafe {
            device.destroy_image_view(self.view, None);
            device.destroy_image(self.handle, None);
        }
        self.device_memory.free(device);
    }
}

/// Whole image, single mip and layer.
pub fn subresource_range(aspect_mask: vk::ImageAspectFlags) -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    }
}
