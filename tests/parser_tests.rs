use jit_trace_studio::model::{CompilationState, CompileKey, JitModel, VendorDetail};
use jit_trace_studio::parser::{
    parse_lines, HotSpotLogParser, J9LogParser, JitLogParser, LogFormat, TagProcessor, ZingLogParser,
};
use jit_trace_studio::utils::diagnostics::{DiagnosticKind, Diagnostics};
use pretty_assertions::assert_eq;

const HOTSPOT_LOG: &str = "\
<?xml version='1.0' encoding='UTF-8'?>
<hotspot_log version='160 1' process='4242' time_ms='1700000000000'>
<vm_version>
<name>
OpenJDK 64-Bit Server VM
</name>
</vm_version>
<tty>
<task_queued compile_id='5' method='java/util/ArrayList size ()I' bytes='5' count='2000' iicount='2000' level='3' stamp='0.050' comment='tiered' hot_count='2000'/>
<task_queued compile_id='6' method='java/util/HashMap hash (Ljava/lang/Object;)I' bytes='20' count='5000' iicount='5000' level='4' stamp='0.060'/>
<nmethod compile_id='5' compiler='c1' level='3' entry='0x00007f00000a0060' size='432' address='0x00007f00000a0010' relocation_offset='296' stamp='0.058'/>
<nmethod compile_id='99' compiler='c2' level='4' size='64' address='0x00007f00000b0000' stamp='0.070'/>
</tty>
<compilation_log thread='22'>
<task compile_id='6' method='java/util/HashMap hash (Ljava/lang/Object;)I' bytes='20' count='5000' stamp='0.065'>
<phase name='parse' nodes='3' live='3' stamp='0.065'>
<failure reason='COMPILE SKIPPED: &lt;clinit&gt; not run' phase='compile'/>
</phase>
<task_done success='0' count='5000' stamp='0.066'/>
</task>
</compilation_log>
</hotspot_log>";

#[test]
fn test_hotspot_lifecycle() {
    let mut parser = HotSpotLogParser::new();
    let mut model = JitModel::new();
    let mut diagnostics = Diagnostics::new();
    let lines = parse_lines(&mut parser, HOTSPOT_LOG.lines(), &mut model, &mut diagnostics);
    assert_eq!(lines, HOTSPOT_LOG.lines().count());

    let installed = model.find_compilation(&CompileKey::standard("5")).unwrap();
    assert_eq!(installed.state(), CompilationState::Installed);
    assert_eq!(installed.native_size, Some(432));
    assert_eq!(installed.address_range, Some(0x7f00000a0010..0x7f00000a01c0));
    assert_eq!(installed.queued_ms, Some(50));
    assert_eq!(installed.installed_ms, Some(58));

    let failed = model.find_compilation(&CompileKey::standard("6")).unwrap();
    assert_eq!(failed.state(), CompilationState::Failed);
    assert_eq!(
        failed.failure_reason.as_deref(),
        Some("COMPILE SKIPPED: <clinit> not run")
    );
    assert!(failed.address_range.is_none());
    assert!(failed.tag.is_some());

    // nmethod 99 was never queued
    assert_eq!(model.compilation_count(), 2);
    assert_eq!(diagnostics.count(DiagnosticKind::UnknownCompileId), 1);
}

#[test]
fn test_hotspot_tree_and_back_links() {
    let mut parser = HotSpotLogParser::new();
    let mut model = JitModel::new();
    let mut diagnostics = Diagnostics::new();
    parse_lines(&mut parser, HOTSPOT_LOG.lines(), &mut model, &mut diagnostics);

    let mut classes: Vec<&str> = model.classes().map(|c| c.name.as_str()).collect();
    classes.sort();
    assert_eq!(classes, vec!["java.util.ArrayList", "java.util.HashMap"]);

    let record = model.find_compilation(&CompileKey::standard("5")).unwrap();
    let member = model.member(record.member);
    assert_eq!(member.signature.member_name, "size");
    assert_eq!(model.class_of(record.member).simple_name(), "ArrayList");
    assert_eq!(model.package_of(record.member).name, "java.util");
}

#[test]
fn test_tiers_accumulate_per_member() {
    let log = "\
<task_queued compile_id='1' method='a/B run ()V' bytes='10' level='3' stamp='1.000'/>
<nmethod compile_id='1' compiler='c1' level='3' size='100' address='0x1000' stamp='1.010'/>
<task_queued compile_id='2' method='a/B run ()V' bytes='10' level='4' stamp='2.000'/>
<nmethod compile_id='2' compiler='c2' level='4' size='80' address='0x2000' stamp='2.050'/>";
    let mut parser = HotSpotLogParser::new();
    let mut model = JitModel::new();
    let mut diagnostics = Diagnostics::new();
    parse_lines(&mut parser, log.lines(), &mut model, &mut diagnostics);

    assert_eq!(model.member_count(), 1);
    let member = model.members().next().unwrap();
    let tiers: Vec<Option<u8>> = member.compilations().iter().map(|c| c.tier).collect();
    assert_eq!(tiers, vec![Some(3), Some(4)]);
    assert_eq!(member.last_compilation().unwrap().compiler.as_deref(), Some("c2"));
    assert!(diagnostics.is_empty());
}

#[test]
fn test_stray_console_text_does_not_swallow_tags() {
    let log = "\
<it's a text line from stdout
<task_queued compile_id='5' method='java/util/ArrayList size ()I' bytes='5' level='3' stamp='0.050'/>
<nmethod compile_id='5' compiler='c1' level='3' size='432' address='0x00007f00000a0010' stamp='0.058'/>";
    let mut parser = HotSpotLogParser::new();
    let mut model = JitModel::new();
    let mut diagnostics = Diagnostics::new();
    parse_lines(&mut parser, log.lines(), &mut model, &mut diagnostics);

    assert_eq!(model.compilation_count(), 1);
    let record = model.find_compilation(&CompileKey::standard("5")).unwrap();
    assert_eq!(record.state(), CompilationState::Installed);
}

#[test]
fn test_unterminated_tag_reported_and_next_tag_kept() {
    let log = "\
<task_queued compile_id='4' method='a/B run ()V' bytes='10'
<task_queued compile_id='5' method='java/util/ArrayList size ()I' bytes='5' level='3' stamp='0.050'/>
<nmethod compile_id='5' compiler='c1' level='3' size='432' address='0x00007f00000a0010' stamp='0.058'/>";
    let mut parser = HotSpotLogParser::new();
    let mut model = JitModel::new();
    let mut diagnostics = Diagnostics::new();
    parse_lines(&mut parser, log.lines(), &mut model, &mut diagnostics);

    assert_eq!(model.compilation_count(), 1);
    assert_eq!(diagnostics.count(DiagnosticKind::MalformedLine), 1);
    assert_eq!(diagnostics.entries()[0].line, Some(2));
}

#[test]
fn test_tag_processor_attribute_order_and_duplicates() {
    let mut processor = TagProcessor::new();
    let tag = processor
        .process_line("<klass id='1' name='a/B' flags='1' name='a/C'/>")
        .unwrap();
    let keys: Vec<&str> = tag.attributes().iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(keys, vec!["id", "name", "flags"]);
    assert_eq!(tag.attribute("name"), Some("a/C"));
}

#[test]
fn test_j9_line_decomposition() {
    let line = "+ (cold) java/lang/Double.longBitsToDouble(J)D @ 00007F6BE4A00034-00007F6BE4A00064 OrdinaryMethod - Q_SZ=0 Q_SZI=0 QW=1 j9m=0000000000096A00 bcsz=3 JNI compThread=0 CpuLoad=0%(0%avg)";
    let mut parser = J9LogParser::new();
    let mut model = JitModel::new();
    let mut diagnostics = Diagnostics::new();
    parse_lines(&mut parser, [line], &mut model, &mut diagnostics);

    let member = model.members().next().unwrap();
    assert_eq!(member.signature.class_name, "java.lang.Double");
    assert_eq!(member.signature.member_name, "longBitsToDouble");
    assert_eq!(member.signature.return_type, "double");
    assert_eq!(member.signature.param_types, vec!["long".to_string()]);

    let record = member.last_compilation().unwrap();
    assert_eq!(record.native_size, Some(0x30));
    assert_eq!(record.state(), CompilationState::Installed);
    assert!(matches!(record.vendor, VendorDetail::J9 { profiled: false, .. }));
}

#[test]
fn test_j9_malformed_line_is_not_fatal() {
    let lines = [
        "#INFO: JIT options",
        "+ (lukewarm) a/B.c()V @ 0x10-0x20 bcsz=1",
        "+ (warm) a/B.d()V @ 0x100-0x180 OrdinaryMethod bcsz=4",
    ];
    let mut parser = J9LogParser::new();
    let mut model = JitModel::new();
    let mut diagnostics = Diagnostics::new();
    parse_lines(&mut parser, lines, &mut model, &mut diagnostics);

    assert_eq!(model.compilation_count(), 1);
    assert_eq!(diagnostics.count(DiagnosticKind::MalformedLine), 1);
    assert_eq!(diagnostics.entries()[0].line, Some(2));
}

#[test]
fn test_zing_queued_and_installed_merge() {
    let lines = [
        "   1.200: 17 !s 2 java.lang.String::hashCode()I (60) (55 bytes)",
        "   1.250: 17 s! 2 installed at 0x30001000 with size 0x1a0 ( java.lang.String::hashCode()I waited 12ms, compile time 3/5 ms ) c1",
    ];
    let mut parser = ZingLogParser::new();
    let mut model = JitModel::new();
    let mut diagnostics = Diagnostics::new();
    parse_lines(&mut parser, lines, &mut model, &mut diagnostics);

    assert_eq!(model.compilation_count(), 1);
    let record = model.find_compilation(&CompileKey::standard("17")).unwrap();
    assert_eq!(record.compile_start_ms, Some(1250));
    assert_eq!(record.queued_ms, Some(1250 - 12));
    assert_eq!(record.installed_ms, Some(1255));
    assert_eq!(record.tier, Some(2));
    assert_eq!(record.address_range, Some(0x30001000..0x300011a0));
}

#[test]
fn test_format_detection_drives_parser_choice() {
    let first: Vec<&str> = HOTSPOT_LOG.lines().take(4).collect();
    let format = LogFormat::detect(&first).unwrap();
    assert_eq!(format, LogFormat::HotSpot);
    assert_eq!(format.parser().format(), LogFormat::HotSpot);

    assert_eq!("zing".parse::<LogFormat>().unwrap(), LogFormat::Zing);
    assert!("jrockit".parse::<LogFormat>().is_err());
}
