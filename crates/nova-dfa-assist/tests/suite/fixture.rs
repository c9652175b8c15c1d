use std::sync::Arc;

use nova_dfa_assist::{
    AnalysisHost, CodeBlockId, LanguageId, ModificationTracker, ProviderRegistry, SourceElement,
};
use nova_flow::{
    AnchorId, ClassInfo, ClassTable, Condition, ControlFlow, ControlFlowBuilder, JvmType,
    PrimitiveKind, Terminator, ValueFactory, VarId,
};
use nova_jdwp::{FrameRef, Location, MockFrame, MockJdwpClient};

pub const FRAME: FrameRef = FrameRef {
    thread: 7,
    frame: 0,
};
pub const MAIN_SIGNATURE: &str = "Lcom/example/Main;";
pub const LINE: u32 = 10;
pub const BRANCH: AnchorId = AnchorId(1);
pub const BLOCK: CodeBlockId = CodeBlockId(0);

type FlowBuilder = dyn Fn(&mut ValueFactory) -> Option<ControlFlow> + Send + Sync;

pub struct TestHost {
    pub tracker: Arc<ModificationTracker>,
    pub dumb: bool,
    providers: ProviderRegistry,
    table: Arc<ClassTable>,
    build: Box<FlowBuilder>,
}

impl TestHost {
    pub fn new(
        build: impl Fn(&mut ValueFactory) -> Option<ControlFlow> + Send + Sync + 'static,
    ) -> Self {
        let mut table = ClassTable::with_well_known();
        table.add_class(ClassInfo::class("com.example.Point"));
        table.add_class(ClassInfo::class("com.example.Main"));
        Self {
            tracker: Arc::new(ModificationTracker::new()),
            dumb: false,
            providers: ProviderRegistry::with_defaults(),
            table: Arc::new(table),
            build: Box::new(build),
        }
    }

    pub fn point(&self) -> JvmType {
        JvmType::Class(self.table.lookup("com.example.Point").expect("Point"))
    }
}

impl AnalysisHost for TestHost {
    fn is_dumb(&self) -> bool {
        self.dumb
    }

    fn modification_tracker(&self) -> Arc<ModificationTracker> {
        self.tracker.clone()
    }

    fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    fn class_table(&self, _block: CodeBlockId) -> Arc<ClassTable> {
        self.table.clone()
    }

    fn build_flow(&self, _block: CodeBlockId, factory: &mut ValueFactory) -> Option<ControlFlow> {
        (self.build)(factory)
    }
}

pub fn element() -> SourceElement {
    SourceElement {
        language: LanguageId::JAVA,
        valid: true,
        enclosing_class: "com.example.Main".to_string(),
        line: LINE,
        anchor: Some(BRANCH),
        code_block: Some(BLOCK),
    }
}

pub fn paused_frame() -> MockFrame {
    MockFrame::new(Location {
        class_signature: MAIN_SIGNATURE.to_string(),
        method: "run".to_string(),
        line: LINE,
        code_index: 4,
    })
}

/// `if (<condition>) { return; } else { return; }` anchored at [`BRANCH`].
pub fn single_branch(condition: Condition) -> ControlFlow {
    let mut b = ControlFlowBuilder::new();
    let entry = b.new_block();
    let then_bb = b.new_block();
    let else_bb = b.new_block();
    b.set_terminator(
        entry,
        Terminator::If {
            condition,
            then_target: then_bb,
            else_target: else_bb,
            anchor: Some(BRANCH),
        },
    );
    b.set_terminator(then_bb, Terminator::Return);
    b.set_terminator(else_bb, Terminator::Return);
    b.bind_anchor(BRANCH, entry);
    b.build(entry)
}

pub fn int_local(factory: &mut ValueFactory, name: &str) -> VarId {
    factory.local(name, &JvmType::Primitive(PrimitiveKind::Int))
}

pub fn double_local(factory: &mut ValueFactory, name: &str) -> VarId {
    factory.local(name, &JvmType::Primitive(PrimitiveKind::Double))
}

/// Client paused in `Main.run` with the given frame contents.
pub fn client_with(frame: MockFrame) -> MockJdwpClient {
    let mut client = MockJdwpClient::new();
    client.set_frame(FRAME, frame);
    client
}
