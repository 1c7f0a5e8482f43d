use std::fmt;
use std::str::FromStr;

use jitscope_types::{
    Block, Graph, Instruction, MOVABLE, NEVER_HOISTED, RECOVERED_ON_BAILOUT, ResumeMode,
    ResumePoint, Script,
};

use crate::hierarchy::{FrameId, InlineTree};

// ── Display mode ────────────────────────────────────────────────

/// What a compilation is drawn as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IrMode {
    /// Mid-level IR blocks.
    #[default]
    Mir,
    /// Low-level IR blocks.
    Lir,
    /// The inline frame tree.
    Src,
}

impl IrMode {
    pub const ALL: [IrMode; 3] = [IrMode::Mir, IrMode::Lir, IrMode::Src];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mir => "mir",
            Self::Lir => "lir",
            Self::Src => "src",
        }
    }
}

impl fmt::Display for IrMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMode(pub String);

impl fmt::Display for UnknownMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown display mode '{}' (expected mir, lir or src)", self.0)
    }
}

impl std::error::Error for UnknownMode {}

impl FromStr for IrMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IrMode::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownMode(s.to_owned()))
    }
}

// ── DOT document model ──────────────────────────────────────────

/// An attribute value, written the way DOT expects it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DotValue {
    /// A bare identifier such as `box` or `red`.
    Id(String),
    /// A double-quoted string.
    Quoted(String),
    /// An HTML-like label, written between `<` and `>`.
    Html(String),
}

impl fmt::Display for DotValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => f.write_str(id),
            Self::Quoted(text) => write!(f, "\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\"")),
            Self::Html(html) => write!(f, "<{html}>"),
        }
    }
}

/// Ordered attribute list. Setting a key twice keeps the first position
/// and the last value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attrs(Vec<(&'static str, DotValue)>);

impl Attrs {
    pub fn set(&mut self, key: &'static str, value: DotValue) {
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&DotValue> {
        self.0.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    fn write_to(&self, out: &mut String) {
        if self.0.is_empty() {
            return;
        }
        out.push_str(" [");
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(&format!("{key}={value}"));
        }
        out.push(']');
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DotNode {
    pub name: String,
    pub attrs: Attrs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DotEdge {
    pub from: String,
    pub to: String,
    pub attrs: Attrs,
}

/// A `digraph` under construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DotGraph {
    pub name: String,
    pub attrs: Attrs,
    pub nodes: Vec<DotNode>,
    pub edges: Vec<DotEdge>,
}

impl DotGraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Attrs::default(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn node(&self, name: &str) -> Option<&DotNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Render the graph as DOT text.
    pub fn to_dot(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("digraph {} {{\n", self.name));
        for (key, value) in &self.attrs.0 {
            out.push_str(&format!("  {key}={value};\n"));
        }
        out.push('\n');
        for node in &self.nodes {
            out.push_str(&format!("  \"{}\"", node.name));
            node.attrs.write_to(&mut out);
            out.push_str(";\n");
        }
        out.push('\n');
        for edge in &self.edges {
            out.push_str(&format!("  \"{}\" -> \"{}\"", edge.from, edge.to));
            edge.attrs.write_to(&mut out);
            out.push_str(";\n");
        }
        out.push_str("}\n");
        out
    }
}

/// Escape free text for an HTML-like label.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

// ── Encoding ────────────────────────────────────────────────────

/// Compiles one compilation into DOT text for `mode`.
pub fn encode(mode: IrMode, graph: &Graph, scripts: &[Script], tree: &InlineTree) -> String {
    build(mode, graph, scripts, tree).to_dot()
}

/// Like [`encode`], but returns the document model.
pub fn build(mode: IrMode, graph: &Graph, scripts: &[Script], tree: &InlineTree) -> DotGraph {
    let mut dot = DotGraph::new(mode.as_str());
    dot.attrs.set("rankdir", DotValue::Id(String::from("TB")));
    dot.attrs.set("splines", DotValue::Id(String::from("true")));

    match mode {
        IrMode::Mir => add_blocks(&mut dot, &graph.mir.blocks, graph, tree),
        IrMode::Lir => add_blocks(&mut dot, &graph.lir.blocks, graph, tree),
        IrMode::Src => add_frames(&mut dot, scripts, tree),
    }
    dot
}

fn style_class(frame: FrameId) -> DotValue {
    DotValue::Quoted(format!("style-frame-{}", frame.get()))
}

fn add_blocks(dot: &mut DotGraph, blocks: &[Block], graph: &Graph, tree: &InlineTree) {
    for (idx, block) in blocks.iter().enumerate() {
        let name = format!("Block{}", block.number);
        let mut attrs = Attrs::default();
        attrs.set("shape", DotValue::Id(String::from("box")));
        attrs.set("label", DotValue::Html(block_label(block)));

        // Decoration and edges always come from the mir block at the same index.
        let mir = graph.mir.blocks.get(idx);
        if let Some(mir) = mir {
            if mir.is_backedge() {
                attrs.set("color", DotValue::Id(String::from("red")));
            }
            if mir.is_loop_header() {
                attrs.set("color", DotValue::Id(String::from("green")));
            }
            if mir.is_split_edge() {
                attrs.set("style", DotValue::Id(String::from("dashed")));
            }
        }
        attrs.set("class", style_class(tree.frame_of(idx).unwrap_or(FrameId::ROOT)));

        if let Some(mir) = mir {
            let branch = mir.successors.len() == 2;
            for (i, succ) in mir.successors.iter().enumerate() {
                let mut edge_attrs = Attrs::default();
                if branch {
                    let label = if i == 0 { "1" } else { "0" };
                    edge_attrs.set("label", DotValue::Id(String::from(label)));
                }
                dot.edges.push(DotEdge {
                    from: name.clone(),
                    to: format!("Block{succ}"),
                    attrs: edge_attrs,
                });
            }
        }

        dot.nodes.push(DotNode { name, attrs });
    }
}

fn add_frames(dot: &mut DotGraph, scripts: &[Script], tree: &InlineTree) {
    for id in tree.frame_ids() {
        let Some(frame) = tree.frame(id) else {
            continue;
        };
        let script = frame.script.as_ref().or(if id == FrameId::ROOT {
            scripts.first()
        } else {
            None
        });
        let mut attrs = Attrs::default();
        attrs.set("shape", DotValue::Id(String::from("box")));
        attrs.set("label", DotValue::Html(frame_label(id, script)));
        attrs.set("class", style_class(id));
        dot.nodes.push(DotNode {
            name: format!("Frame{}", id.get()),
            attrs,
        });
        if let Some(parent) = frame.parent {
            dot.edges.push(DotEdge {
                from: format!("Frame{}", parent.get()),
                to: format!("Frame{}", id.get()),
                attrs: Attrs::default(),
            });
        }
    }
}

const TABLE_OPEN: &str = r#"<table border="0" cellborder="0" cellpadding="1">"#;

fn header_row(out: &mut String, title: &str) {
    out.push_str(&format!(
        r#"<tr><td align="center" bgcolor="black" colspan="3"><font color="white">{title}</font></td></tr>"#
    ));
}

fn block_label(block: &Block) -> String {
    let mut out = String::from(TABLE_OPEN);
    header_row(&mut out, &format!("Block {}", block.number));
    if let Some(rp) = &block.resume_point {
        resume_point_row(&mut out, rp);
    }
    for ins in &block.instructions {
        instruction_rows(&mut out, ins);
    }
    out.push_str("</table>");
    out
}

fn frame_label(id: FrameId, script: Option<&Script>) -> String {
    let mut out = String::from(TABLE_OPEN);
    match script {
        Some(script) => {
            header_row(&mut out, &escape_html(script.name()));
            out.push_str(&format!(
                r#"<tr><td align="left" colspan="3">{}</td></tr>"#,
                escape_html(&script.location())
            ));
        }
        None => header_row(&mut out, &format!("frame {}", id.get())),
    }
    out.push_str("</table>");
    out
}

fn resume_point_row(out: &mut String, rp: &ResumePoint) {
    out.push_str("<tr>");
    match rp.caller {
        Some(caller) => {
            out.push_str(&format!(r#"<td align="left">&#40;&#40;{caller}&#41;&#41;</td>"#));
        }
        None => out.push_str(r#"<td align="left"></td>"#),
    }
    out.push_str(&format!(
        r#"<td align="left"><font color="grey50">resumepoint {}</font></td><td></td></tr>"#,
        escape_html(&rp.operand_list())
    ));
}

fn instruction_resume_point(out: &mut String, ins: &Instruction, mode: ResumeMode) {
    if let Some(rp) = &ins.resume_point
        && rp.mode == mode
    {
        resume_point_row(out, rp);
    }
}

fn instruction_rows(out: &mut String, ins: &Instruction) {
    instruction_resume_point(out, ins, ResumeMode::At);

    let mut opcode = escape_html(&ins.opcode);
    if ins.has_attribute(RECOVERED_ON_BAILOUT) {
        opcode = format!(r#"<font color="gray50">{opcode}</font>"#);
    } else if ins.has_attribute(MOVABLE) {
        opcode = format!(r#"<font color="blue">{opcode}</font>"#);
    }
    if ins.has_attribute(NEVER_HOISTED) {
        opcode = format!("<u>{opcode}</u>");
    }
    let ty = ins.result_type().map(escape_html).unwrap_or_default();
    out.push_str(&format!(
        r#"<tr><td align="left" port="i{id}">{id}</td><td align="left">{opcode}</td><td align="right">{ty}</td></tr>"#,
        id = ins.id,
    ));

    if !ins.mem_inputs.is_empty() {
        let inputs = ins
            .mem_inputs
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        out.push_str(&format!(
            r#"<tr><td align="left"></td><td align="left"><font color="grey50">memory {inputs}</font></td><td></td></tr>"#
        ));
    }

    instruction_resume_point(out, ins, ResumeMode::After);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::reconstruct;

    fn graph(json: &str) -> Graph {
        facet_json::from_str(json).expect("graph must decode")
    }

    fn script(name: &str, url: &str, line: u32) -> Script {
        Script {
            display_name: Some(name.to_owned()),
            url: url.to_owned(),
            start_line: line,
            line_count: 3,
            source_start: 0,
            source_length: 10,
        }
    }

    const THREE_BLOCKS: &str = r#"{
        "mir": {"blocks": [
            {"number": 0, "successors": [1], "predecessors": [], "attributes": [], "instructions": []},
            {"number": 1, "successors": [2], "predecessors": [0], "attributes": [], "instructions": [],
             "resumePoint": {"mode": "At", "caller": 0, "operands": []}},
            {"number": 2, "successors": [], "predecessors": [1], "attributes": [], "instructions": [],
             "resumePoint": {"mode": "At", "caller": 0, "operands": []}}
        ]},
        "lir": {"blocks": []}
    }"#;

    #[test]
    fn three_block_snapshot_round_trip() {
        let graph = graph(THREE_BLOCKS);
        let scripts = vec![
            script("outer", "file:///a/outer.js", 1),
            script("inner", "file:///a/inner.js", 7),
            script("inner", "file:///a/inner.js", 7),
        ];
        let tree = reconstruct(&graph.mir.blocks, &scripts);
        assert_eq!(tree.frame_of(0), Some(FrameId::ROOT));
        let f1 = tree.frame_of(1).expect("block 1 frame");
        assert_ne!(f1, FrameId::ROOT);
        assert_eq!(tree.frame(f1).and_then(|f| f.parent), Some(FrameId::ROOT));
        assert_eq!(tree.frame_of(2), Some(f1));

        let dot = build(IrMode::Mir, &graph, &scripts, &tree);
        assert_eq!(dot.nodes.len(), 3);
        let edges: Vec<_> = dot
            .edges
            .iter()
            .map(|e| (e.from.as_str(), e.to.as_str()))
            .collect();
        assert_eq!(edges, vec![("Block0", "Block1"), ("Block1", "Block2")]);
        assert_eq!(
            dot.node("Block2").and_then(|n| n.attrs.get("class")),
            Some(&DotValue::Quoted(String::from("style-frame-1")))
        );

        let text = dot.to_dot();
        assert!(text.starts_with("digraph mir {\n"), "{text}");
        assert!(text.contains("  rankdir=TB;\n"));
        assert!(text.contains("  splines=true;\n"));
        assert!(text.contains("\"Block0\" -> \"Block1\";"), "{text}");
    }

    #[test]
    fn two_successors_are_labelled_true_then_false() {
        let graph = graph(
            r#"{"mir":{"blocks":[
                {"number":0,"successors":[1,2],"predecessors":[],"attributes":[],"instructions":[]},
                {"number":1,"successors":[3],"predecessors":[0],"attributes":[],"instructions":[]},
                {"number":2,"successors":[3],"predecessors":[0],"attributes":[],"instructions":[]},
                {"number":3,"successors":[],"predecessors":[1,2],"attributes":[],"instructions":[]}
            ]}}"#,
        );
        let tree = reconstruct(&graph.mir.blocks, &[]);
        let dot = build(IrMode::Mir, &graph, &[], &tree);
        let labels: Vec<_> = dot
            .edges
            .iter()
            .map(|e| e.attrs.get("label").cloned())
            .collect();
        assert_eq!(
            labels,
            vec![
                Some(DotValue::Id(String::from("1"))),
                Some(DotValue::Id(String::from("0"))),
                None,
                None,
            ]
        );
        assert!(dot.to_dot().contains("\"Block0\" -> \"Block1\" [label=1];"));
    }

    #[test]
    fn loop_header_color_wins_over_backedge() {
        let graph = graph(
            r#"{"mir":{"blocks":[
                {"number":0,"successors":[],"predecessors":[],"attributes":["backedge","loopheader","splitedge"],"instructions":[]},
                {"number":1,"successors":[],"predecessors":[],"attributes":["backedge"],"instructions":[]}
            ]}}"#,
        );
        let tree = reconstruct(&graph.mir.blocks, &[]);
        let dot = build(IrMode::Mir, &graph, &[], &tree);
        let b0 = dot.node("Block0").expect("block 0");
        assert_eq!(b0.attrs.get("color"), Some(&DotValue::Id(String::from("green"))));
        assert_eq!(b0.attrs.get("style"), Some(&DotValue::Id(String::from("dashed"))));
        let b1 = dot.node("Block1").expect("block 1");
        assert_eq!(b1.attrs.get("color"), Some(&DotValue::Id(String::from("red"))));
        assert_eq!(b1.attrs.get("style"), None);
    }

    #[test]
    fn lir_nodes_take_decoration_and_edges_from_mir() {
        let graph = graph(
            r#"{
            "mir":{"blocks":[
                {"number":0,"successors":[1],"predecessors":[],"attributes":["loopheader"],"instructions":[]},
                {"number":1,"successors":[],"predecessors":[0],"attributes":[],"instructions":[]}
            ]},
            "lir":{"blocks":[
                {"number":0,"successors":[],"predecessors":[],"attributes":[],
                 "instructions":[{"id":4,"opcode":"MoveGroup","type":"None"}]},
                {"number":1,"successors":[],"predecessors":[],"attributes":[],"instructions":[]}
            ]}}"#,
        );
        let tree = reconstruct(&graph.mir.blocks, &[]);
        let dot = build(IrMode::Lir, &graph, &[], &tree);
        assert_eq!(dot.name, "lir");
        assert_eq!(
            dot.node("Block0").and_then(|n| n.attrs.get("color")),
            Some(&DotValue::Id(String::from("green")))
        );
        assert_eq!(dot.edges.len(), 1);
        let Some(DotValue::Html(label)) = dot.node("Block0").and_then(|n| n.attrs.get("label"))
        else {
            panic!("block label must be html");
        };
        assert!(label.contains("MoveGroup"));
        assert!(label.contains(r#"<td align="right"></td>"#));
    }

    #[test]
    fn instruction_rows_carry_decorations_and_resume_points() {
        let graph = graph(
            r#"{"mir":{"blocks":[{
                "number":5,"successors":[],"predecessors":[],"attributes":[],
                "resumePoint":{"mode":"At","caller":2,"operands":[1,"|",3]},
                "instructions":[
                    {"id":10,"opcode":"compare<lt>","type":"Boolean","attributes":["Movable","NeverHoisted"],
                     "resumePoint":{"mode":"At","operands":[7]}},
                    {"id":11,"opcode":"recover","type":"None","attributes":["RecoveredOnBailout","Movable"],
                     "memInputs":[3,4],"resumePoint":{"mode":"After","operands":[8]}},
                    {"id":12,"opcode":"outer","resumePoint":{"mode":"Outer","operands":[99]}}
                ]
            }]}}"#,
        );
        let tree = reconstruct(&graph.mir.blocks, &[]);
        let dot = build(IrMode::Mir, &graph, &[], &tree);
        let Some(DotValue::Html(label)) = dot.node("Block5").and_then(|n| n.attrs.get("label"))
        else {
            panic!("block label must be html");
        };
        assert!(label.starts_with(TABLE_OPEN));
        assert!(label.contains(r#"<font color="white">Block 5</font>"#));
        assert!(label.contains("&#40;&#40;2&#41;&#41;"));
        assert!(label.contains("resumepoint 1 | 3"));
        assert!(label.contains(r#"<u><font color="blue">compare&lt;lt&gt;</font></u>"#));
        assert!(label.contains(r#"<td align="right">Boolean</td>"#));
        assert!(label.contains(r#"<font color="gray50">recover</font>"#));
        assert!(label.contains("memory 3 4"));
        assert!(!label.contains("resumepoint 99"));

        let at = label.find("resumepoint 7").expect("At resume point row");
        let compare = label.find("port=\"i10\"").expect("instruction row");
        let after = label.find("resumepoint 8").expect("After resume point row");
        let recover = label.find("port=\"i11\"").expect("instruction row");
        assert!(at < compare);
        assert!(recover < after);
    }

    #[test]
    fn src_mode_draws_the_frame_tree() {
        let graph = graph(THREE_BLOCKS);
        let scripts = vec![
            script("outer", "file:///a/outer.js", 1),
            script("<inner>", "file:///a/inner.js", 7),
            script("<inner>", "file:///a/inner.js", 7),
        ];
        let tree = reconstruct(&graph.mir.blocks, &scripts);
        let dot = build(IrMode::Src, &graph, &scripts, &tree);
        assert_eq!(dot.nodes.len(), 2);
        assert_eq!(dot.edges.len(), 1);
        assert_eq!((dot.edges[0].from.as_str(), dot.edges[0].to.as_str()), ("Frame0", "Frame1"));
        let Some(DotValue::Html(label)) = dot.node("Frame1").and_then(|n| n.attrs.get("label"))
        else {
            panic!("frame label must be html");
        };
        assert!(label.contains("&lt;inner&gt;"));
        assert!(label.contains("inner.js:7"));
    }

    #[test]
    fn escaping_covers_html_specials() {
        assert_eq!(
            escape_html(r#"a&b<c>"d"'e'"#),
            "a&amp;b&lt;c&gt;&quot;d&quot;&#39;e&#39;"
        );
        assert_eq!(
            DotValue::Quoted(String::from(r#"say "hi""#)).to_string(),
            r#""say \"hi\"""#
        );
    }

    #[test]
    fn modes_parse_case_insensitively() {
        assert_eq!("LIR".parse::<IrMode>(), Ok(IrMode::Lir));
        assert_eq!(" src ".parse::<IrMode>(), Ok(IrMode::Src));
        assert!("svg".parse::<IrMode>().is_err());
        assert_eq!(IrMode::default(), IrMode::Mir);
    }

    #[test]
    fn document_text_lists_attrs_then_nodes_then_edges() {
        let mut dot = DotGraph::new("g");
        dot.attrs.set("rankdir", DotValue::Id(String::from("TB")));
        let mut attrs = Attrs::default();
        attrs.set("shape", DotValue::Id(String::from("box")));
        attrs.set("label", DotValue::Html(String::from("<b>x</b>")));
        dot.nodes.push(DotNode {
            name: String::from("A"),
            attrs,
        });
        dot.nodes.push(DotNode {
            name: String::from("B"),
            attrs: Attrs::default(),
        });
        let mut attrs = Attrs::default();
        attrs.set("label", DotValue::Quoted(String::from("yes")));
        dot.edges.push(DotEdge {
            from: String::from("A"),
            to: String::from("B"),
            attrs,
        });

        assert_eq!(
            dot.to_dot(),
            "digraph g {\n  rankdir=TB;\n\n  \"A\" [shape=box,label=<<b>x</b>>];\n  \"B\";\n\n  \"A\" -> \"B\" [label=\"yes\"];\n}\n"
        );
    }
}
