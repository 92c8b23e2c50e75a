use crate::error::Result;
use crate::vulkan::device::Device;
use crate::vulkan::device_memory::DeviceMemory;
use bytemuck::Pod;
use erupt::vk;

pub struct Buffer {
    handle: vk::Buffer,
    device_memory: DeviceMemory,
    size: u64,
}

impl Buffer {
    pub fn handle(&self) -> vk::Buffer {
        self.handle
    }

    pub fn empty(
        device: &Device,
        size: u64,
        usage: vk::BufferUsageFlags,
        allocation_flags: gpu_alloc::UsageFlags,
    ) -> Result<Self> {
        Self::empty_aligned(device, size, usage, allocation_flags, 1)
    }

    /// Allocates so the buffer's start satisfies `min_alignment`, for uses such as
    /// shader tables and acceleration storage that need a stricter base address.
    pub fn empty_aligned(
        device: &Device,
        size: u64,
        usage: vk::BufferUsageFlags,
        allocation_flags: gpu_alloc::UsageFlags,
        min_alignment: u64,
    ) -> Result<Self> {
        let size = size.max(1);
        let create_info = vk::BufferCreateInfoBuilder::new()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);
        let handle = unsafe { device.create_buffer(&create_info, None) }.result()?;

        let mem_reqs = unsafe { device.get_buffer_memory_requirements(handle) };
        let device_memory = match DeviceMemory::new(device, mem_reqs, allocation_flags, min_alignment)
        {
            Ok(device_memory) => device_memory,
            Err(err) => {
                unsafe { device.destroy_buffer(handle, None) };
                return Err(err);
            }
        };
        device_memory.bind_to_buffer(device, handle)?;

        Ok(Buffer {
            handle,
            device_memory,
            size,
        })
    }

    /// Host visible buffer initialized with `data`.
    pub fn with_data<T: Pod>(
        device: &Device,
        data: &[T],
        usage: vk::BufferUsageFlags,
    ) -> Result<Self> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let mut buffer = Self::empty(
            device,
            bytes.len() as u64,
            usage,
            gpu_alloc::UsageFlags::HOST_ACCESS | gpu_alloc::UsageFlags::DEVICE_ADDRESS,
        )?;
        buffer.write_bytes(device, bytes, 0)?;
        Ok(buffer)
    }

    /// `offset` is counted in elements of `T`.
    pub fn write_data<T: Pod>(&mut self, device: &Device, data: &[T], offset: u64) -> Result<()> {
        let offset = offset * std::mem::size_of::<T>() as u64;
        self.write_bytes(device, bytemuck::cast_slice(data), offset)
    }

    pub fn write_bytes(&mut self, device: &Device, data: &[u8], offset: u64) -> Result<()> {
        debug_assert!(offset + data.len() as u64 <= self.size);
        self.device_memory.write_bytes(device, offset, data)
    }

    pub fn read_bytes(&mut self, device: &Device, data: &mut [u8]) -> Result<()> {
        debug_assert!(data.len() as u64 <= self.size);
        self.device_memory.read_bytes(device, 0, data)
    }

    pub fn get_device_address(&self, device: &Device) -> vk::DeviceAddress {
        let info = vk::BufferDeviceAddressInfoBuilder::new().buffer(self.handle);
        unsafe { device.get_buffer_device_address(&info) }
    }

    pub fn destroy(&mut self, device: &Device) {
        unsafe {
            device.destroy_buffer(self.handle, None);
        }
        self.device_memory.free(device);
        self.handle = vk::Buffer::null();
    }
}
