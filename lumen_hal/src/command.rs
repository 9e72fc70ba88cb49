//! Command model - the closed set of operations a backend executes
//!
//! Commands reference GPU resources exclusively through [`ObjectId`]s;
//! the backend resolves identifiers through its registry at execution
//! time. Command lists are ordered sequences built incrementally and
//! executed once or attached to a named list for reuse.

use crate::object_id::ObjectId;

// ===== INDEX TYPES =====

/// Index element type for indexed draws
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    /// 16-bit indices
    U16,
    /// 32-bit indices
    U32,
}

// ===== COLOR BLEND TYPES =====

/// Blend factor for color blending equations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
    ConstantColor,
    OneMinusConstantColor,
    SrcAlphaSaturate,
}

/// Blend operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendOp {
    /// result = src * srcFactor + dst * dstFactor
    Add,
    /// result = src * srcFactor - dst * dstFactor
    Subtract,
    /// result = dst * dstFactor - src * srcFactor
    ReverseSubtract,
    /// result = min(src, dst)
    Min,
    /// result = max(src, dst)
    Max,
}

/// Color write mask
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorWriteMask {
    pub r: bool,
    pub g: bool,
    pub b: bool,
    pub a: bool,
}

impl ColorWriteMask {
    /// All channels enabled
    pub const ALL: Self = Self { r: true, g: true, b: true, a: true };
    /// No channels enabled
    pub const NONE: Self = Self { r: false, g: false, b: false, a: false };
}

impl Default for ColorWriteMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// Color blending state
#[derive(Debug, Clone, Copy)]
pub struct ColorBlendState {
    /// Enable blending
    pub blend_enable: bool,
    /// Source color blend factor
    pub src_color_factor: BlendFactor,
    /// Destination color blend factor
    pub dst_color_factor: BlendFactor,
    /// Color blend operation
    pub color_blend_op: BlendOp,
    /// Source alpha blend factor
    pub src_alpha_factor: BlendFactor,
    /// Destination alpha blend factor
    pub dst_alpha_factor: BlendFactor,
    /// Alpha blend operation
    pub alpha_blend_op: BlendOp,
    /// Color write mask
    pub color_write_mask: ColorWriteMask,
}

impl Default for ColorBlendState {
    fn default() -> Self {
        Self {
            blend_enable: false,
            src_color_factor: BlendFactor::One,
            dst_color_factor: BlendFactor::Zero,
            color_blend_op: BlendOp::Add,
            src_alpha_factor: BlendFactor::One,
            dst_alpha_factor: BlendFactor::Zero,
            alpha_blend_op: BlendOp::Add,
            color_write_mask: ColorWriteMask::ALL,
        }
    }
}

// ===== STENCIL TYPES =====

/// Comparison operator for stencil tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// Never pass
    Never,
    /// Pass if value < reference
    Less,
    /// Pass if value == reference
    Equal,
    /// Pass if value <= reference
    LessOrEqual,
    /// Pass if value > reference
    Greater,
    /// Pass if value != reference
    NotEqual,
    /// Pass if value >= reference
    GreaterOrEqual,
    /// Always pass
    Always,
}

/// Stencil operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StencilOp {
    /// Keep current value
    Keep,
    /// Set to zero
    Zero,
    /// Replace with reference value
    Replace,
    /// Increment and clamp to max
    IncrementAndClamp,
    /// Decrement and clamp to zero
    DecrementAndClamp,
    /// Bitwise invert
    Invert,
    /// Increment and wrap around
    IncrementAndWrap,
    /// Decrement and wrap around
    DecrementAndWrap,
}

/// Stencil operation state (per-face)
#[derive(Debug, Clone, Copy)]
pub struct StencilFaceState {
    /// Action on stencil test fail
    pub fail_op: StencilOp,
    /// Action on stencil pass + depth pass
    pub pass_op: StencilOp,
    /// Action on stencil pass + depth fail
    pub depth_fail_op: StencilOp,
    /// Comparison operator
    pub compare_op: CompareOp,
    /// Bits of stencil buffer read for compare
    pub compare_mask: u32,
    /// Bits of stencil buffer written
    pub write_mask: u32,
    /// Reference value for compare/replace
    pub reference: u32,
}

impl Default for StencilFaceState {
    fn default() -> Self {
        Self {
            fail_op: StencilOp::Keep,
            pass_op: StencilOp::Keep,
            depth_fail_op: StencilOp::Keep,
            compare_op: CompareOp::Always,
            compare_mask: 0xFF,
            write_mask: 0xFF,
            reference: 0,
        }
    }
}

/// Stencil testing state
#[derive(Debug, Clone, Copy, Default)]
pub struct StencilState {
    /// Enable stencil testing
    pub test_enable: bool,
    /// Stencil operations for front faces
    pub front: StencilFaceState,
    /// Stencil operations for back faces
    pub back: StencilFaceState,
}

// ===== COMMANDS =====

/// One backend operation
///
/// The set is closed: a backend matches exhaustively and dispatches each
/// variant to its translator.
#[derive(Debug, Clone, Copy)]
pub enum Command {
    /// Draw vertices from a named vertex buffer
    Draw {
        /// Vertex buffer identifier
        vertex_source: ObjectId,
        /// Number of vertices to draw
        vertex_count: u32,
        /// Index of the first vertex
        first_vertex: u32,
    },

    /// Draw indexed vertices from named vertex and index buffers
    DrawIndexed {
        /// Vertex buffer identifier
        vertex_source: ObjectId,
        /// Index buffer identifier
        index_source: ObjectId,
        /// Index element type
        index_kind: IndexKind,
        /// Number of indices to draw
        index_count: u32,
        /// Index of the first index
        first_index: u32,
        /// Value added to each index before addressing the vertex buffer
        vertex_offset: i32,
    },

    /// Draw with parameters read from a named indirect buffer
    DrawIndirect {
        /// Vertex buffer identifier
        vertex_source: ObjectId,
        /// Indirect parameter buffer identifier
        indirect_source: ObjectId,
        /// Byte offset of the first parameter record
        indirect_offset: u64,
        /// Number of parameter records to consume
        draw_count: u32,
        /// Byte stride between parameter records
        stride: u32,
    },

    /// Indexed draw with parameters read from a named indirect buffer
    DrawIndexedIndirect {
        /// Vertex buffer identifier
        vertex_source: ObjectId,
        /// Index buffer identifier
        index_source: ObjectId,
        /// Index element type
        index_kind: IndexKind,
        /// Indirect parameter buffer identifier
        indirect_source: ObjectId,
        /// Byte offset of the first parameter record
        indirect_offset: u64,
        /// Number of parameter records to consume
        draw_count: u32,
        /// Byte stride between parameter records
        stride: u32,
    },

    /// Configure color blending for subsequent draws
    SetBlending(ColorBlendState),

    /// Configure stencil testing for subsequent draws
    SetStencil(StencilState),
}

/// Ordered, heterogeneous sequence of commands
///
/// Built incrementally with [`CommandList::push`], then executed once via
/// the backend's ephemeral path or attached to a named list for reuse.
#[derive(Debug, Clone, Default)]
pub struct CommandList {
    commands: Vec<Command>,
}

impl CommandList {
    /// Create an empty command list
    pub fn new() -> Self {
        Self { commands: Vec::new() }
    }

    /// Append a command
    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Number of recorded commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// True if no commands are recorded
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Remove all recorded commands
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Iterate commands in recording order
    pub fn iter(&self) -> std::slice::Iter<'_, Command> {
        self.commands.iter()
    }
}

impl Extend<Command> for CommandList {
    fn extend<T: IntoIterator<Item = Command>>(&mut self, iter: T) {
        self.commands.extend(iter);
    }
}

impl<'a> IntoIterator for &'a CommandList {
    type Item = &'a Command;
    type IntoIter = std::slice::Iter<'a, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
