use facet::Facet;

/// One compilation's control-flow graph at two lowering stages.
///
/// Blocks are positional: index `i` of [`Graph::mir`] and index `i` of
/// [`Graph::lir`] describe the same basic block.
#[derive(Facet, Debug, Clone, Default)]
pub struct Graph {
    #[facet(default)]
    pub mir: IrPass,
    #[facet(default)]
    pub lir: IrPass,
}

/// The block list of one IR pass.
#[derive(Facet, Debug, Clone, Default)]
pub struct IrPass {
    #[facet(default)]
    pub blocks: Vec<Block>,
}

/// A basic block.
#[derive(Facet, Debug, Clone)]
#[facet(rename_all = "camelCase")]
pub struct Block {
    pub number: u32,
    #[facet(default)]
    pub instructions: Vec<Instruction>,
    /// Entry resume point. Inlined blocks carry a `caller` here.
    #[facet(default)]
    pub resume_point: Option<ResumePoint>,
    /// Indices of predecessor blocks in the same pass.
    #[facet(default)]
    pub predecessors: Vec<u32>,
    /// Indices of successor blocks in the same pass.
    #[facet(default)]
    pub successors: Vec<u32>,
    #[facet(default)]
    pub attributes: Vec<String>,
}

impl Block {
    pub fn has_attribute(&self, tag: &str) -> bool {
        self.attributes.iter().any(|attr| attr == tag)
    }

    pub fn is_backedge(&self) -> bool {
        self.has_attribute(BACKEDGE)
    }

    pub fn is_loop_header(&self) -> bool {
        self.has_attribute(LOOP_HEADER)
    }

    pub fn is_split_edge(&self) -> bool {
        self.has_attribute(SPLIT_EDGE)
    }

    /// Block index of the call site this block was inlined from, if any.
    pub fn caller(&self) -> Option<u32> {
        self.resume_point.as_ref().and_then(|rp| rp.caller)
    }
}

pub const BACKEDGE: &str = "backedge";
pub const LOOP_HEADER: &str = "loopheader";
pub const SPLIT_EDGE: &str = "splitedge";

/// A single IR instruction.
#[derive(Facet, Debug, Clone)]
#[facet(rename_all = "camelCase")]
pub struct Instruction {
    /// Unique within its block.
    pub id: u32,
    pub opcode: String,
    #[facet(rename = "type", default)]
    pub ty: Option<String>,
    #[facet(default)]
    pub attributes: Vec<String>,
    /// Ids of the instructions this one depends on through memory.
    #[facet(default)]
    pub mem_inputs: Vec<u32>,
    #[facet(default)]
    pub resume_point: Option<ResumePoint>,
}

impl Instruction {
    pub fn has_attribute(&self, tag: &str) -> bool {
        self.attributes.iter().any(|attr| attr == tag)
    }

    /// Result type, unless the producer reported none.
    pub fn result_type(&self) -> Option<&str> {
        self.ty.as_deref().filter(|ty| *ty != "None")
    }
}

pub const RECOVERED_ON_BAILOUT: &str = "RecoveredOnBailout";
pub const MOVABLE: &str = "Movable";
pub const NEVER_HOISTED: &str = "NeverHoisted";

/// A deoptimization checkpoint recorded by the compiler.
#[derive(Facet, Debug, Clone)]
pub struct ResumePoint {
    pub mode: ResumeMode,
    /// Operand descriptors: instruction ids, with `"|"` separating the
    /// operands of nested inline frames.
    #[facet(default)]
    pub operands: Vec<facet_value::Value>,
    /// Index of the block holding the call site that was inlined here.
    #[facet(default)]
    pub caller: Option<u32>,
}

impl ResumePoint {
    /// Operands rendered as space-separated text.
    pub fn operand_list(&self) -> String {
        self.operands
            .iter()
            .map(operand_text)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Where a resume point sits relative to its instruction.
#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResumeMode {
    At,
    After,
    Outer,
}

/// Textual form of one operand descriptor.
pub fn operand_text(value: &facet_value::Value) -> String {
    if let Some(text) = value.as_string() {
        return text.as_str().to_string();
    }
    if let Some(number) = value.as_number()
        && let Some(int) = number.to_i64()
    {
        return int.to_string();
    }
    facet_json::to_string(value).unwrap_or_else(|_| String::from("?"))
}
