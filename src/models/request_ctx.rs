//! 请求上下文
//!
//! 封装"这是哪个协调器发出的第几代请求"这一信息。
//! 协调器每次重置都会推进代次，响应回来时代次对不上就直接丢弃。

use std::fmt::Display;

/// 发出请求的协调器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Upload,
    Translation,
    Question,
}

/// 单调递增的请求代次
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// 代次计数器，每个协调器各持有一个
#[derive(Debug, Default)]
pub struct GenerationCounter {
    current: Generation,
}

impl GenerationCounter {
    /// 推进到下一代，之前发出的请求全部作废
    pub fn advance(&mut self) -> Generation {
        self.current = Generation(self.current.0 + 1);
        self.current
    }

    pub fn current(&self) -> Generation {
        self.current
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.current == generation
    }
}

/// 请求上下文
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestCtx {
    pub kind: RequestKind,
    pub generation: Generation,
}

impl RequestCtx {
    pub fn new(kind: RequestKind, generation: Generation) -> Self {
        Self { kind, generation }
    }
}

impl Display for RequestCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            RequestKind::Upload => "上传",
            RequestKind::Translation => "翻译",
            RequestKind::Question => "问答",
        };
        write!(f, "[{} 第{}代]", kind, self.generation.0)
    }
}
