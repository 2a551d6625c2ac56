//! [`FrameRenderer`] over a window surface
//!
//! Owns the swapchain, the forward render pass, one command buffer and
//! one [`FrameSync`] per slot, and one [`RenderTarget`] per swapchain
//! image. The swapchain is rebuilt lazily at the start of a frame after a
//! resize, a suboptimal acquire or an out-of-date present.

use std::rc::Rc;

use ash::prelude::VkResult;
use ash::vk;
use ash::vk::Handle;

use super::commands::VulkanCommandRecorder;
use super::context::VulkanContext;
use super::framebuffer::RenderTarget;
use super::render_pass::RenderPass;
use super::swapchain::Swapchain;
use super::sync::FrameSync;
use super::{VulkanError, VulkanResult};
use crate::render::device::RenderPassHandle;
use crate::render::error::{RenderError, RenderResult};
use crate::render::frame::{DrawRecorder, FrameRenderer};

const CLEAR_COLOR: [f32; 4] = [0.01, 0.01, 0.01, 1.0];

/// Image to draw into after an acquire, or `None` when the frame is skipped
///
/// Sets `recreate` when the swapchain no longer matches the surface.
pub(crate) fn acquired_image(result: VkResult<(u32, bool)>, recreate: &mut bool) -> VulkanResult<Option<u32>> {
    match result {
        Ok((index, suboptimal)) => {
            *recreate |= suboptimal;
            Ok(Some(index))
        }
        Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
            *recreate = true;
            Ok(None)
        }
        Err(e) => Err(VulkanError::Api(e)),
    }
}

/// Whether the swapchain must be rebuilt after a present
pub(crate) fn present_needs_recreate(result: VkResult<bool>) -> VulkanResult<bool> {
    match result {
        Ok(suboptimal) => Ok(suboptimal),
        Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(true),
        Err(e) => Err(VulkanError::Api(e)),
    }
}

fn open_frame_error(message: &str) -> RenderError {
    RenderError::InvalidConfiguration(message.to_string())
}

/// Vulkan drawing context
pub struct VulkanRenderer {
    frames: Vec<FrameSync>,
    command_buffers: Vec<vk::CommandBuffer>,
    command_pool: vk::CommandPool,
    targets: Vec<RenderTarget>,
    swapchain: Swapchain,
    render_pass: RenderPass,
    requested: vk::Extent2D,
    recreate: bool,
    current_frame: usize,
    image_index: Option<u32>,
    pass_open: bool,
    context: Rc<VulkanContext>,
}

impl VulkanRenderer {
    /// Build the swapchain and per-slot objects for a `width` x `height` surface
    pub fn new(context: Rc<VulkanContext>, frames_in_flight: usize, width: u32, height: u32) -> VulkanResult<Self> {
        if frames_in_flight == 0 {
            return Err(VulkanError::InitializationFailed(
                "frames in flight must be at least 1".to_string(),
            ));
        }
        let device = context.device().clone();
        let requested = vk::Extent2D { width, height };
        let initial = vk::Extent2D {
            width: width.max(1),
            height: height.max(1),
        };

        let swapchain = Swapchain::new(&context, initial, vk::SwapchainKHR::null())?;
        let render_pass = RenderPass::forward(device.clone(), swapchain.format())?;
        let targets = RenderTarget::for_images(
            &device,
            context.memory_properties(),
            render_pass.handle(),
            swapchain.image_views(),
            swapchain.extent(),
        )?;
        let frames = (0..frames_in_flight)
            .map(|_| FrameSync::new(&device))
            .collect::<VulkanResult<Vec<_>>>()?;

        let pool_info = vk::CommandPoolCreateInfo::builder()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(context.queue_families().graphics);
        let command_pool = unsafe { device.create_command_pool(&pool_info, None).map_err(VulkanError::Api)? };
        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(frames_in_flight as u32);
        let command_buffers = match unsafe { device.allocate_command_buffers(&alloc_info) } {
            Ok(buffers) => buffers,
            Err(e) => {
                unsafe { device.destroy_command_pool(command_pool, None) };
                return Err(VulkanError::Api(e));
            }
        };

        log::info!("Vulkan renderer ready with {frames_in_flight} frames in flight");
        Ok(Self {
            frames,
            command_buffers,
            command_pool,
            targets,
            swapchain,
            render_pass,
            requested,
            recreate: false,
            current_frame: 0,
            image_index: None,
            pass_open: false,
            context,
        })
    }

    /// Extent of the current swapchain images
    pub fn swapchain_extent(&self) -> vk::Extent2D {
        self.swapchain.extent()
    }

    fn recreate_swapchain(&mut self) -> VulkanResult<()> {
        unsafe { self.context.device().device_wait_idle().map_err(VulkanError::Api)? };

        let swapchain = Swapchain::new(&self.context, self.requested, self.swapchain.handle())?;
        if swapchain.format() != self.render_pass.color_format() {
            return Err(VulkanError::InitializationFailed(format!(
                "surface format changed from {:?} to {:?}",
                self.render_pass.color_format(),
                swapchain.format()
            )));
        }
        // Old targets reference the old image views
        self.targets.clear();
        self.swapchain = swapchain;
        self.targets = RenderTarget::for_images(
            self.context.device(),
            self.context.memory_properties(),
            self.render_pass.handle(),
            self.swapchain.image_views(),
            self.swapchain.extent(),
        )?;
        self.recreate = false;

        let extent = self.swapchain.extent();
        log::debug!("Swapchain recreated at {}x{}", extent.width, extent.height);
        Ok(())
    }

    fn command_buffer(&self) -> vk::CommandBuffer {
        self.command_buffers[self.current_frame]
    }
}

impl FrameRenderer for VulkanRenderer {
    fn render_pass(&self) -> RenderPassHandle {
        RenderPassHandle(self.render_pass.handle().as_raw())
    }

    fn max_frames_in_flight(&self) -> usize {
        self.frames.len()
    }

    fn aspect_ratio(&self) -> f32 {
        self.requested.width as f32 / self.requested.height.max(1) as f32
    }

    fn set_extent(&mut self, width: u32, height: u32) {
        if (width, height) != (self.requested.width, self.requested.height) {
            self.requested = vk::Extent2D { width, height };
            self.recreate = true;
        }
    }

    fn begin_frame(&mut self) -> RenderResult<Option<Box<dyn DrawRecorder>>> {
        if self.image_index.is_some() {
            return Err(open_frame_error("begin_frame called while a frame is in progress"));
        }
        if self.requested.width == 0 || self.requested.height == 0 {
            return Ok(None);
        }

        self.frames[self.current_frame].in_flight.wait()?;
        if self.recreate {
            self.recreate_swapchain()?;
        }

        let sync = &self.frames[self.current_frame];
        let acquired = unsafe {
            self.context.swapchain_loader().acquire_next_image(
                self.swapchain.handle(),
                u64::MAX,
                sync.image_available.handle(),
                vk::Fence::null(),
            )
        };
        let Some(image_index) = acquired_image(acquired, &mut self.recreate)? else {
            log::trace!("Swapchain out of date, skipping frame");
            return Ok(None);
        };

        // Only reset once work is certain to be submitted
        self.frames[self.current_frame].in_flight.reset()?;

        let device = self.context.device();
        let command_buffer = self.command_buffer();
        let begin_info = vk::CommandBufferBeginInfo::builder().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe {
            device
                .reset_command_buffer(command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(VulkanError::Api)?;
            device
                .begin_command_buffer(command_buffer, &begin_info)
                .map_err(VulkanError::Api)?;
        }

        self.image_index = Some(image_index);
        Ok(Some(Box::new(VulkanCommandRecorder::new(device.clone(), command_buffer))))
    }

    fn frame_index(&self) -> usize {
        self.current_frame
    }

    fn begin_pass(&mut self, _commands: &mut dyn DrawRecorder) -> RenderResult<()> {
        let Some(image_index) = self.image_index.filter(|_| !self.pass_open) else {
            return Err(open_frame_error("begin_pass requires an open frame and no open pass"));
        };
        let target = self
            .targets
            .get(image_index as usize)
            .ok_or_else(|| open_frame_error("acquired image has no render target"))?;

        let extent = self.swapchain.extent();
        let render_area = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        };
        let clear_values = [
            vk::ClearValue {
                color: vk::ClearColorValue { float32: CLEAR_COLOR },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue { depth: 1.0, stencil: 0 },
            },
        ];
        let begin_info = vk::RenderPassBeginInfo::builder()
            .render_pass(self.render_pass.handle())
            .framebuffer(target.framebuffer.handle())
            .render_area(render_area)
            .clear_values(&clear_values);
        let viewport = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };

        let device = self.context.device();
        let command_buffer = self.command_buffer();
        unsafe {
            device.cmd_begin_render_pass(command_buffer, &begin_info, vk::SubpassContents::INLINE);
            device.cmd_set_viewport(command_buffer, 0, &[viewport]);
            device.cmd_set_scissor(command_buffer, 0, &[render_area]);
        }
        self.pass_open = true;
        Ok(())
    }

    fn end_pass(&mut self, _commands: &mut dyn DrawRecorder) -> RenderResult<()> {
        if !self.pass_open {
            return Err(open_frame_error("end_pass without begin_pass"));
        }
        unsafe { self.context.device().cmd_end_render_pass(self.command_buffer()) };
        self.pass_open = false;
        Ok(())
    }

    fn end_frame(&mut self, commands: Box<dyn DrawRecorder>) -> RenderResult<()> {
        drop(commands);
        if self.pass_open {
            return Err(open_frame_error("end_frame requires an open frame with its pass ended"));
        }
        let image_index = self
            .image_index
            .take()
            .ok_or_else(|| open_frame_error("end_frame requires an open frame with its pass ended"))?;
        let target = self
            .targets
            .get(image_index as usize)
            .ok_or_else(|| open_frame_error("acquired image has no render target"))?;
        let sync = &self.frames[self.current_frame];
        let device = self.context.device();
        let command_buffer = self.command_buffer();

        let wait_semaphores = [sync.image_available.handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [command_buffer];
        let signal_semaphores = [target.render_finished.handle()];
        let submit = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores)
            .build();
        unsafe {
            device.end_command_buffer(command_buffer).map_err(VulkanError::Api)?;
            device
                .queue_submit(self.context.graphics_queue(), &[submit], sync.in_flight.handle())
                .map_err(VulkanError::Api)?;
        }

        let swapchains = [self.swapchain.handle()];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&signal_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);
        let presented = unsafe {
            self.context
                .swapchain_loader()
                .queue_present(self.context.present_queue(), &present_info)
        };
        if present_needs_recreate(presented)? {
            self.recreate = true;
        }

        self.current_frame = (self.current_frame + 1) % self.frames.len();
        Ok(())
    }
}

impl Drop for VulkanRenderer {
    fn drop(&mut self) {
        unsafe {
            if let Err(e) = self.context.device().device_wait_idle() {
                log::warn!("device_wait_idle failed during teardown: {e:?}");
            }
            self.context.device().destroy_command_pool(self.command_pool, None);
        }
        log::debug!("Vulkan renderer destroyed");
    }
}
