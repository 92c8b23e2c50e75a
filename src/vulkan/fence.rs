use crate::error::Result;
use crate::vulkan::device::Device;
use erupt::vk;

pub struct Fence {
    handle: vk::Fence,
}

impl Fence {
    pub fn new(device: &Device, signaled: bool) -> Result<Self> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let create_info = vk::FenceCreateInfoBuilder::new().flags(flags);
        let handle = unsafe { device.handle().create_fence(&create_info, None) }.result()?;

        Ok(Self { handle })
    }

    pub fn wait(&self, device: &Device) -> Result<()> {
        unsafe { device.handle().wait_for_fences(&[self.handle], true, u64::MAX) }.result()?;
        Ok(())
    }

    pub fn reset(&self, device: &Device) -> Result<()> {
        unsafe { device.handle().reset_fences(&[self.handle]) }.result()?;
        Ok(())
    }

    pub fn destroy(&self, device: &Device) {
        unsafe {
            device.handle().destroy_fence(self.handle, None);
        }
    }

    pub fn handle(&self) -> vk::Fence {
        self.handle
    }
}
