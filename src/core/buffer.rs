//! Buffer and memory helpers shared by both samples. Vertex and index data
//! go through a staging buffer into DEVICE_LOCAL memory; uniform buffers
//! stay HOST_VISIBLE and are rewritten every frame.

use anyhow::Result;
use ash::vk;

pub unsafe fn find_memory_type(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    type_filter: u32,
    properties: vk::MemoryPropertyFlags,
) -> Result<u32> {
    let mem_properties = instance.get_physical_device_memory_properties(physical_device);

    for i in 0..mem_properties.memory_type_count {
        if (type_filter & (1 << i)) != 0
            && mem_properties.memory_types[i as usize]
                .property_flags
                .contains(properties)
        {
            return Ok(i);
        }
    }

    Err(anyhow::anyhow!("Failed to find suitable memory type"))
}

pub unsafe fn create_buffer(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    device: &ash::Device,
    size: vk::DeviceSize,
    usage: vk::BufferUsageFlags,
    properties: vk::MemoryPropertyFlags,
) -> Result<(vk::Buffer, vk::DeviceMemory)> {
    let buffer_info = vk::BufferCreateInfo::default()
        .size(size)
        .usage(usage)
        .sharing_mode(vk::SharingMode::EXCLUSIVE);

    let buffer = device.create_buffer(&buffer_info, None)?;
    let mem_requirements = device.get_buffer_memory_requirements(buffer);

    let alloc_info = vk::MemoryAllocateInfo::default()
        .allocation_size(mem_requirements.size)
        .memory_type_index(find_memory_type(
            instance,
            physical_device,
            mem_requirements.memory_type_bits,
            properties,
        )?);

    let buffer_memory = device.allocate_memory(&alloc_info, None)?;
    device.bind_buffer_memory(buffer, buffer_memory, 0)?;

    Ok((buffer, buffer_memory))
}

/// Allocate and begin a single-use primary command buffer.
pub unsafe fn begin_one_time_commands(
    device: &ash::Device,
    command_pool: vk::CommandPool,
) -> Result<vk::CommandBuffer> {
    let alloc_info = vk::CommandBufferAllocateInfo::default()
        .level(vk::CommandBufferLevel::PRIMARY)
        .command_pool(command_pool)
        .command_buffer_count(1);

    let command_buffer = device.allocate_command_buffers(&alloc_info)?[0];

    let begin_info =
        vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
    device.begin_command_buffer(command_buffer, &begin_info)?;

    Ok(command_buffer)
}

/// End, submit and free a command buffer from [`begin_one_time_commands`],
/// waiting for the queue to drain.
pub unsafe fn end_one_time_commands(
    device: &ash::Device,
    command_pool: vk::CommandPool,
    queue: vk::Queue,
    command_buffer: vk::CommandBuffer,
) -> Result<()> {
    device.end_command_buffer(command_buffer)?;

    let command_buffers = [command_buffer];
    let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);

    device.queue_submit(queue, &[submit_info], vk::Fence::null())?;
    device.queue_wait_idle(queue)?;

    device.free_command_buffers(command_pool, &command_buffers);

    Ok(())
}

pub unsafe fn copy_buffer(
    device: &ash::Device,
    command_pool: vk::CommandPool,
    queue: vk::Queue,
    src_buffer: vk::Buffer,
    dst_buffer: vk::Buffer,
    size: vk::DeviceSize,
) -> Result<()> {
    let command_buffer = begin_one_time_commands(device, command_pool)?;

    let copy_region = vk::BufferCopy::default().size(size);
    device.cmd_copy_buffer(command_buffer, src_buffer, dst_buffer, &[copy_region]);

    end_one_time_commands(device, command_pool, queue, command_buffer)
}

/// Upload `data` into a DEVICE_LOCAL buffer through a staging buffer.
pub unsafe fn create_device_local_buffer<T: bytemuck::Pod>(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    device: &ash::Device,
    command_pool: vk::CommandPool,
    queue: vk::Queue,
    usage: vk::BufferUsageFlags,
    data: &[T],
) -> Result<(vk::Buffer, vk::DeviceMemory)> {
    let bytes: &[u8] = bytemuck::cast_slice(data);
    let buffer_size = bytes.len() as vk::DeviceSize;

    let (staging_buffer, staging_memory) = create_buffer(
        instance,
        physical_device,
        device,
        buffer_size,
        vk::BufferUsageFlags::TRANSFER_SRC,
        vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
    )?;

    let mapped = device.map_memory(staging_memory, 0, buffer_size, vk::MemoryMapFlags::empty())?;
    std::ptr::copy_nonoverlapping(bytes.as_ptr(), mapped as *mut u8, bytes.len());
    device.unmap_memory(staging_memory);

    let (buffer, memory) = create_buffer(
        instance,
        physical_device,
        device,
        buffer_size,
        vk::BufferUsageFlags::TRANSFER_DST | usage,
        vk::MemoryPropertyFlags::DEVICE_LOCAL,
    )?;

    copy_buffer(device, command_pool, queue, staging_buffer, buffer, buffer_size)?;

    device.destroy_buffer(staging_buffer, None);
    device.free_memory(staging_memory, None);

    Ok((buffer, memory))
}

pub unsafe fn create_vertex_buffer<T: bytemuck::Pod>(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    device: &ash::Device,
    command_pool: vk::CommandPool,
    queue: vk::Queue,
    vertices: &[T],
) -> Result<(vk::Buffer, vk::DeviceMemory)> {
    create_device_local_buffer(
        instance,
        physical_device,
        device,
        command_pool,
        queue,
        vk::BufferUsageFlags::VERTEX_BUFFER,
        vertices,
    )
}

pub unsafe fn create_index_buffer(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    device: &ash::Device,
    command_pool: vk::CommandPool,
    queue: vk::Queue,
    indices: &[u32],
) -> Result<(vk::Buffer, vk::DeviceMemory)> {
    create_device_local_buffer(
        instance,
        physical_device,
        device,
        command_pool,
        queue,
        vk::BufferUsageFlags::INDEX_BUFFER,
        indices,
    )
}

/// Host-visible uniform buffer, one per in-flight frame.
pub struct UniformBuffer {
    pub buffer: vk::Buffer,
    pub memory: vk::DeviceMemory,
    pub size: vk::DeviceSize,
}

impl UniformBuffer {
    pub unsafe fn new(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        device: &ash::Device,
        size: vk::DeviceSize,
    ) -> Result<Self> {
        let (buffer, memory) = create_buffer(
            instance,
            physical_device,
            device,
            size,
            vk::BufferUsageFlags::UNIFORM_BUFFER,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;

        Ok(Self { buffer, memory, size })
    }

    /// Map, copy `data`, unmap. `data` must not exceed the buffer size.
    pub unsafe fn update<T: bytemuck::Pod>(&self, device: &ash::Device, data: &T) -> Result<()> {
        let bytes = bytemuck::bytes_of(data);
        anyhow::ensure!(
            bytes.len() as vk::DeviceSize <= self.size,
            "Uniform data ({} bytes) exceeds buffer size ({})",
            bytes.len(),
            self.size
        );

        let mapped = device.map_memory(self.memory, 0, self.size, vk::MemoryMapFlags::empty())?;
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), mapped as *mut u8, bytes.len());
        device.unmap_memory(self.memory);
        Ok(())
    }

    pub fn descriptor_info(&self) -> vk::DescriptorBufferInfo {
        vk::DescriptorBufferInfo::default()
            .buffer(self.buffer)
            .offset(0)
            .range(self.size)
    }

    pub unsafe fn destroy(&mut self, device: &ash::Device) {
        device.destroy_buffer(self.buffer, None);
        device.free_memory(self.memory, None);
        self.buffer = vk::Buffer::null();
        self.memory = vk::DeviceMemory::null();
    }
}
