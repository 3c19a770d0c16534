use crate::types::ModelDescriptor;

pub const DEFAULT_LOCAL_MODEL: &str = "Qwen3-1.7B-q4f16_1-MLC";
pub const DEFAULT_CONTEXT_WINDOW: u32 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalModel {
    pub id: &'static str,
    pub name: &'static str,
    pub params: &'static str,
    pub vram: &'static str,
    /// Compiled context window size in tokens.
    pub context_window: u32,
    pub tag: &'static str,
}

// One per size tier, q4f16 quantization for smaller downloads.
pub const LOCAL_MODELS: &[LocalModel] = &[
    LocalModel {
        id: "SmolLM2-360M-Instruct-q4f16_1-MLC",
        name: "SmolLM2",
        params: "360M",
        vram: "376 MB",
        context_window: 4096,
        tag: "Tiny",
    },
    LocalModel {
        id: "TinyLlama-1.1B-Chat-v1.0-q4f16_1-MLC",
        name: "TinyLlama",
        params: "1.1B",
        vram: "697 MB",
        context_window: 2048,
        tag: "Light",
    },
    LocalModel {
        id: "Llama-3.2-1B-Instruct-q4f16_1-MLC",
        name: "Llama 3.2",
        params: "1B",
        vram: "879 MB",
        context_window: 4096,
        tag: "",
    },
    LocalModel {
        id: "Qwen2.5-1.5B-Instruct-q4f16_1-MLC",
        name: "Qwen 2.5",
        params: "1.5B",
        vram: "1.6 GB",
        context_window: 4096,
        tag: "",
    },
    LocalModel {
        id: "Qwen3-1.7B-q4f16_1-MLC",
        name: "Qwen 3",
        params: "1.7B",
        vram: "2.0 GB",
        context_window: 4096,
        tag: "Recommended",
    },
    LocalModel {
        id: "Llama-3.2-3B-Instruct-q4f16_1-MLC",
        name: "Llama 3.2",
        params: "3B",
        vram: "2.3 GB",
        context_window: 4096,
        tag: "",
    },
    LocalModel {
        id: "Qwen3-4B-q4f16_1-MLC",
        name: "Qwen 3",
        params: "4B",
        vram: "3.4 GB",
        context_window: 4096,
        tag: "",
    },
    LocalModel {
        id: "Phi-3.5-mini-instruct-q4f16_1-MLC",
        name: "Phi 3.5 Mini",
        params: "3.8B",
        vram: "3.7 GB",
        context_window: 4096,
        tag: "",
    },
    LocalModel {
        id: "DeepSeek-R1-Distill-Qwen-7B-q4f16_1-MLC",
        name: "DeepSeek R1",
        params: "7B",
        vram: "5.1 GB",
        context_window: 4096,
        tag: "Reasoning",
    },
    LocalModel {
        id: "Qwen3-8B-q4f16_1-MLC",
        name: "Qwen 3",
        params: "8B",
        vram: "5.7 GB",
        context_window: 4096,
        tag: "Best",
    },
];

pub fn find_local_model(id: &str) -> Option<&'static LocalModel> {
    LOCAL_MODELS.iter().find(|model| model.id == id)
}

pub fn model_context(id: &str) -> u32 {
    find_local_model(id)
        .map(|model| model.context_window)
        .unwrap_or(DEFAULT_CONTEXT_WINDOW)
}

pub fn descriptor_for(id: &str) -> ModelDescriptor {
    ModelDescriptor::new(id, model_context(id))
}
