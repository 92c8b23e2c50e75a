use crate::error::Result;
use crate::vulkan::command_buffer::CommandBuffer;
use crate::vulkan::device::Device;
use crate::vulkan::fence::Fence;
use erupt::vk;

pub struct CommandPool {
    handle: vk::CommandPool,
}

impl CommandPool {
    pub fn new(device: &Device, queue_family_index: u32, reset: bool) -> Result<Self> {
        let create_info = vk::CommandPoolCreateInfoBuilder::new()
            .queue_family_index(queue_family_index)
            .flags(if reset {
                vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER
            } else {
                vk::CommandPoolCreateFlags::TRANSIENT
            });
        let handle = unsafe { device.handle().create_command_pool(&create_info, None) }.result()?;

        Ok(Self { handle })
    }

    pub fn destroy(&self, device: &Device) {
        unsafe {
            device.handle().destroy_command_pool(self.handle, None);
        }
    }

    pub fn allocate(&self, device: &Device, count: u32) -> Result<Vec<CommandBuffer>> {
        let alloc_info = vk::CommandBufferAllocateInfoBuilder::new()
            .command_pool(self.handle)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        let command_buffers =
            unsafe { device.handle().allocate_command_buffers(&alloc_info) }.result()?;

        Ok(command_buffers
            .iter()
            .map(|cb| CommandBuffer::new(*cb))
            .collect::<Vec<_>>())
    }

    /// Records `record` into a throwaway command buffer and blocks until the
    /// queue has executed it.
    pub fn single_time_submit<F>(device: &Device, record: F) -> Result<()>
    where
        F: FnOnce(CommandBuffer),
    {
        let pool = CommandPool::new(device, device.queue_family_index(), false)?;
        let result = pool.submit_and_wait(device, record);
        pool.destroy(device);
        result
    }

    fn submit_and_wait<F>(&self, device: &Device, record: F) -> Result<()>
    where
        F: FnOnce(CommandBuffer),
    {
        let command_buffers = self.allocate(device, 1)?;
        let command_buffer = command_buffers[0];

        command_buffer.begin(device)?;
        record(command_buffer);
        command_buffer.end(device)?;

        let fence = Fence::new(device, false)?;
        let submitted = device
            .submit(&[command_buffer.handle()], fence.handle())
            .and_then(|_| fence.wait(device));
        fence.destroy(device);
        submitted
    }
}
