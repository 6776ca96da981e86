#[path = "common/mod.rs"]
mod common;

#[path = "buffer/buffer_layout.rs"]
mod buffer_layout;
#[path = "buffer/buffer_views.rs"]
mod buffer_views;

#[path = "weights/weights_load.rs"]
mod weights_load;

#[path = "kernel/kernel_registry.rs"]
mod kernel_registry;

#[path = "engine/engine_order.rs"]
mod engine_order;
#[path = "engine/engine_errors.rs"]
mod engine_errors;
#[path = "engine/engine_progress.rs"]
mod engine_progress;
#[path = "engine/engine_trace.rs"]
mod engine_trace;

#[path = "descriptor/descriptor_json.rs"]
mod descriptor_json;
#[path = "descriptor/model_dir.rs"]
mod model_dir;
