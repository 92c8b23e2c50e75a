use crate::error::{Error, Result};
use crate::vulkan::buffer::Buffer;
use crate::vulkan::device::Device;
use crate::vulkan::raytracing::acceleration_structure::round_up;
use erupt::vk;

/// Device limits that shape the shader binding table.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ShaderGroupLimits {
    pub handle_size: u32,
    pub handle_alignment: u32,
    pub base_alignment: u32,
    pub max_stride: u32,
}

/// A shader group handle followed by the record's inline arguments.
#[derive(Clone, Debug, PartialEq)]
pub struct ShaderRecord {
    pub group_index: u32,
    pub args: Vec<u8>,
}

impl ShaderRecord {
    pub fn new(group_index: u32) -> Self {
        ShaderRecord {
            group_index,
            args: Vec::new(),
        }
    }

    pub fn with_args(group_index: u32, args: Vec<u8>) -> Self {
        ShaderRecord { group_index, args }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct TableRegion {
    pub offset: u64,
    pub stride: u64,
    pub size: u64,
    pub count: u32,
}

impl TableRegion {
    fn strided_region(&self, base_address: vk::DeviceAddress) -> vk::StridedDeviceAddressRegionKHR {
        if self.count == 0 {
            return vk::StridedDeviceAddressRegionKHR::default();
        }
        vk::StridedDeviceAddressRegionKHR {
            device_address: base_address + self.offset,
            stride: self.stride,
            size: self.size,
        }
    }
}

/// Byte layout of a raygen, miss and hit table sharing one buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct ShaderTableLayout {
    pub handle_size: u64,
    pub raygen: TableRegion,
    pub miss: TableRegion,
    pub hit: TableRegion,
    pub total_size: u64,
}

impl ShaderTableLayout {
    pub fn new(
        limits: &ShaderGroupLimits,
        raygen: &[ShaderRecord],
        miss: &[ShaderRecord],
        hit: &[ShaderRecord],
    ) -> Result<Self> {
        if raygen.len() != 1 {
            return Err(Error::ShaderTable(format!(
                "expected exactly one raygen record, got {}",
                raygen.len()
            )));
        }

        let raygen_stride = record_stride(limits, raygen)?;
        let raygen = TableRegion {
            offset: 0,
            stride: raygen_stride,
            size: raygen_stride,
            count: 1,
        };
        let miss = region_after(limits, &raygen, miss)?;
        let hit = region_after(limits, &miss, hit)?;

        Ok(ShaderTableLayout {
            handle_size: limits.handle_size as u64,
            raygen,
            miss,
            hit,
            total_size: hit.offset + hit.size,
        })
    }

    /// Builds the table contents from the tightly packed group handles
    /// returned by the pipeline.
    pub fn fill(
        &self,
        group_handles: &[u8],
        raygen: &[ShaderRecord],
        miss: &[ShaderRecord],
        hit: &[ShaderRecord],
    ) -> Result<Vec<u8>> {
        let mut table = vec![0u8; self.total_size as usize];
        for (region, records) in [(&self.raygen, raygen), (&self.miss, miss), (&self.hit, hit)] {
            if records.len() != region.count as usize {
                return Err(Error::ShaderTable(format!(
                    "layout expects {} records, got {}",
                    region.count,
                    records.len()
                )));
            }
            for (i, record) in records.iter().enumerate() {
                let start = (region.offset + i as u64 * region.stride) as usize;
                let slot = &mut table[start..start + region.stride as usize];
                self.write_record(slot, group_handles, record)?;
            }
        }
        Ok(table)
    }

    fn write_record(
        &self,
        slot: &mut [u8],
        group_handles: &[u8],
        record: &ShaderRecord,
    ) -> Result<()> {
        let handle_size = self.handle_size as usize;
        let handle_start = record.group_index as usize * handle_size;
        let handle = group_handles
            .get(handle_start..handle_start + handle_size)
            .ok_or_else(|| {
                Error::ShaderTable(format!("no handle for shader group {}", record.group_index))
            })?;

        slot[..handle_size].copy_from_slice(handle);
        slot[handle_size..handle_size + record.args.len()].copy_from_slice(&record.args);
        Ok(())
    }
}

fn record_stride(limits: &ShaderGroupLimits, records: &[ShaderRecord]) -> Result<u64> {
    let max_args = records.iter().map(|record| record.args.len()).max().unwrap_or(0) as u64;
    let stride = round_up(
        limits.handle_size as u64 + max_args,
        limits.handle_alignment.max(1) as u64,
    );
    if stride > limits.max_stride as u64 {
        return Err(Error::ShaderTable(format!(
            "record stride {} exceeds the device limit {}",
            stride, limits.max_stride
        )));
    }
    Ok(stride)
}

fn region_after(
    limits: &ShaderGroupLimits,
    previous: &TableRegion,
    records: &[ShaderRecord],
) -> Result<TableRegion> {
    let stride = record_stride(limits, records)?;
    Ok(TableRegion {
        offset: round_up(
            previous.offset + previous.size,
            limits.base_alignment.max(1) as u64,
        ),
        stride,
        size: stride * records.len() as u64,
        count: records.len() as u32,
    })
}

pub struct ShaderBindingTable {
    layout: ShaderTableLayout,
    buffer: Buffer,
    address: vk::DeviceAddress,
}

impl ShaderBindingTable {
    pub fn new(
        device: &Device,
        pipeline: vk::Pipeline,
        group_count: u32,
        limits: &ShaderGroupLimits,
        raygen: &[ShaderRecord],
        miss: &[ShaderRecord],
        hit: &[ShaderRecord],
    ) -> Result<Self> {
        let layout = ShaderTableLayout::new(limits, raygen, miss, hit)?;

        let mut group_handles = vec![0u8; (limits.handle_size * group_count) as usize];
        unsafe {
            device.get_ray_tracing_shader_group_handles_khr(
                pipeline,
                0,
                group_count,
                group_handles.len(),
                group_handles.as_mut_ptr() as _,
            )
        }
        .result()?;

        let table = layout.fill(&group_handles, raygen, miss, hit)?;

        let mut buffer = Buffer::empty_aligned(
            device,
            layout.total_size,
            vk::BufferUsageFlags::SHADER_BINDING_TABLE_KHR
                | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS,
            gpu_alloc::UsageFlags::HOST_ACCESS | gpu_alloc::UsageFlags::DEVICE_ADDRESS,
            limits.base_alignment as u64,
        )?;
        buffer.write_bytes(device, &table, 0)?;
        let address = buffer.get_device_address(device);

        log::info!(
            "Shader binding table: {} bytes, strides raygen {} miss {} hit {} ({} hit records)",
            layout.total_size,
            layout.raygen.stride,
            layout.miss.stride,
            layout.hit.stride,
            layout.hit.count
        );

        Ok(ShaderBindingTable {
            layout,
            buffer,
            address,
        })
    }

    pub fn raygen_device_region(&self) -> vk::StridedDeviceAddressRegionKHR {
        self.layout.raygen.strided_region(self.address)
    }

    pub fn miss_device_region(&self) -> vk::StridedDeviceAddressRegionKHR {
        self.layout.miss.strided_region(self.address)
    }

    pub fn hit_device_region(&self) -> vk::StridedDeviceAddressRegionKHR {
        self.layout.hit.strided_region(self.address)
    }

    pub fn callable_device_region(&self) -> vk::StridedDeviceAddressRegionKHR {
        vk::StridedDeviceAddressRegionKHR::default()
    }

    pub fn destroy(&mut self, device: &Device) {
        self.buffer.destroy(device);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMITS: ShaderGroupLimits = ShaderGroupLimits {
        handle_size: 32,
        handle_alignment: 32,
        base_alignment: 64,
        max_stride: 4096,
    };

    fn handles(count: u32) -> Vec<u8> {
        (0..count)
            .flat_map(|group| std::iter::repeat(group as u8 + 1).take(32))
            .collect()
    }

    fn hit_records() -> Vec<ShaderRecord> {
        vec![
            ShaderRecord::with_args(3, vec![0xAA; 64]),
            ShaderRecord::with_args(4, vec![0xBB; 64]),
            ShaderRecord::with_args(5, vec![0xCC; 72]),
            ShaderRecord::with_args(6, vec![0xDD; 72]),
        ]
    }

    #[test]
    fn record_strides_follow_largest_args() {
        let layout = ShaderTableLayout::new(
            &LIMITS,
            &[ShaderRecord::new(0)],
            &[ShaderRecord::new(1), ShaderRecord::new(2)],
            &hit_records(),
        )
        .unwrap();

        assert_eq!(layout.raygen.stride, 32);
        assert_eq!(layout.miss.stride, 32);
        // 32 byte handle + 72 byte args rounded to the handle alignment.
        assert_eq!(layout.hit.stride, 128);
        assert_eq!(layout.hit.stride % LIMITS.handle_alignment as u64, 0);
    }

    #[test]
    fn regions_start_on_base_alignment() {
        let layout = ShaderTableLayout::new(
            &LIMITS,
            &[ShaderRecord::new(0)],
            &[ShaderRecord::new(1), ShaderRecord::new(2)],
            &hit_records(),
        )
        .unwrap();

        assert_eq!(layout.raygen.offset, 0);
        assert_eq!(layout.raygen.size, layout.raygen.stride);
        assert_eq!(layout.miss.offset, 64);
        assert_eq!(layout.miss.size, 64);
        assert_eq!(layout.hit.offset, 128);
        assert_eq!(layout.hit.size, 4 * 128);
        assert_eq!(layout.total_size, 128 + 512);
        for region in [layout.raygen, layout.miss, layout.hit] {
            assert_eq!(region.offset % LIMITS.base_alignment as u64, 0);
        }
    }

    #[test]
    fn filled_records_carry_handle_then_args() {
        let raygen = [ShaderRecord::new(0)];
        let miss = [ShaderRecord::new(1), ShaderRecord::new(2)];
        let hit = hit_records();
        let layout = ShaderTableLayout::new(&LIMITS, &raygen, &miss, &hit).unwrap();
        let table = layout.fill(&handles(7), &raygen, &miss, &hit).unwrap();

        assert_eq!(table.len() as u64, layout.total_size);
        assert!(table[..32].iter().all(|&b| b == 1));
        assert!(table[64..96].iter().all(|&b| b == 2));
        assert!(table[96..128].iter().all(|&b| b == 3));

        let third_hit = (layout.hit.offset + 2 * layout.hit.stride) as usize;
        assert!(table[third_hit..third_hit + 32].iter().all(|&b| b == 6));
        assert!(table[third_hit + 32..third_hit + 104].iter().all(|&b| b == 0xCC));
        assert!(table[third_hit + 104..third_hit + 128].iter().all(|&b| b == 0));
    }

    #[test]
    fn oversized_records_are_rejected() {
        let limits = ShaderGroupLimits {
            max_stride: 64,
            ..LIMITS
        };
        let result = ShaderTableLayout::new(
            &limits,
            &[ShaderRecord::new(0)],
            &[ShaderRecord::new(1)],
            &[ShaderRecord::with_args(2, vec![0; 40])],
        );
        assert!(matches!(result, Err(Error::ShaderTable(_))));
    }

    #[test]
    fn requires_a_single_raygen_record() {
        let result = ShaderTableLayout::new(&LIMITS, &[], &[ShaderRecord::new(1)], &[]);
        assert!(matches!(result, Err(Error::ShaderTable(_))));
    }

    #[test]
    fn missing_group_handle_is_an_error() {
        let raygen = [ShaderRecord::new(0)];
        let miss = [ShaderRecord::new(9)];
        let layout = ShaderTableLayout::new(&LIMITS, &raygen, &miss, &[]).unwrap();
        let result = layout.fill(&handles(3), &raygen, &miss, &[]);
        assert!(matches!(result, Err(Error::ShaderTable(_))));
    }

    #[test]
    fn empty_regions_produce_null_device_regions() {
        let layout =
            ShaderTableLayout::new(&LIMITS, &[ShaderRecord::new(0)], &[ShaderRecord::new(1)], &[])
                .unwrap();
        let region = layout.hit.strided_region(0x10000);
        assert_eq!(region.device_address, 0);
        assert_eq!(region.size, 0);
        let raygen = layout.raygen.strided_region(0x10000);
        assert_eq!(raygen.device_address, 0x10000);
        assert_eq!(raygen.size, raygen.stride);
    }
}
