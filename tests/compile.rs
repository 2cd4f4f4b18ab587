use chlc::bytecode::op::{Opcode, flag};
use chlc::bytecode::stack_check;
use chlc::compiler::parse_error::ParseErrorKind;
use chlc::{ChlFile, Compiler, CompilerOptions, Error, Project};

fn compile(source: &str) -> ChlFile {
    compile_opts(source, CompilerOptions::default())
}

fn compile_opts(source: &str, options: CompilerOptions) -> ChlFile {
    let mut c = Compiler::new(options);
    c.parse_source(source, "test.txt").unwrap();
    c.into_chl_file().unwrap()
}

fn compile_err(source: &str) -> Error {
    let mut c = Compiler::default();
    match c.parse_source(source, "test.txt") {
        Err(e) => e,
        Ok(()) => c.seal().err().unwrap(),
    }
}

fn listing(chl: &ChlFile, name: &str) -> Vec<String> {
    let script = chl.scripts.by_name(name).unwrap();
    let start = script.instruction_address as usize;
    let mut res = Vec::new();
    for instr in &chl.code[start..] {
        res.push(instr.render(Some(chl), Some(script), None));
        if instr.opcode == Opcode::End {
            break;
        }
    }
    res
}

#[test]
fn test_local_initializer() {
    let chl = compile("begin script Foo\n\tlocal x = 3\nend script Foo\n");
    let foo = chl.scripts.by_name("Foo").unwrap();
    assert_eq!(foo.variables, vec!["x"]);
    let code = listing(&chl, "Foo");
    let at = code.iter().position(|i| i == "PUSHF 3.0").unwrap();
    assert_eq!(code[at + 1], "POPF x");
    assert_eq!(code.last().map(String::as_str), Some("END"));
}

#[test]
fn test_while_scaffold() {
    let chl = compile("begin script W\nstart\nwhile 1 == 1\nend while\nend script W\n");
    let entry = chl.scripts.by_name("W").unwrap().instruction_address as usize;
    let code = &chl.code[entry..];
    let jz = code.iter().position(|i| i.opcode == Opcode::Jz).unwrap();
    let target = code[jz].int_val() as usize;
    assert_eq!(chl.code[target].opcode, Opcode::EndExcept);
    assert!(code[jz].flags & flag::FORWARD == flag::FORWARD);

    let back = code[jz..].iter().find(|i| i.opcode == Opcode::Jmp).unwrap();
    assert!((back.int_val() as usize) < entry + jz);
    assert_eq!(back.flags & flag::FORWARD, 0);
    assert!(code.iter().any(|i| i.opcode == Opcode::IterExcept));
}

#[test]
fn test_forward_script_call() {
    let mut c = Compiler::default();
    c.parse_source(
        "begin script B\nstart\nrun script A\nend script B\nbegin script A\nstart\nend script A\n",
        "test.txt",
    )
    .unwrap();
    c.seal().unwrap();
    assert!(c.usage_count("A") >= 1);
    let chl = c.into_chl_file().unwrap();
    let a = chl.scripts.by_name("A").unwrap().script_id;
    let call = chl.code.iter().find(|i| i.opcode == Opcode::Call).unwrap();
    assert_eq!(call.int_val(), a);
    assert!(listing(&chl, "B").contains(&"CALL A".to_string()));
}

#[test]
fn test_shared_strings() {
    let source = "begin script S\nstart\nsay \"go\"\nsay \"go\"\nend script S\n";
    // say pushes the string offset, then the interaction mode
    let offsets = |chl: &ChlFile| -> Vec<i32> {
        chl.code
            .windows(3)
            .filter(|w| w[0].opcode == Opcode::Push && w[1].opcode == Opcode::Push && w[2].opcode == Opcode::Sys)
            .map(|w| w[0].int_val())
            .collect()
    };
    let shared = compile(source);
    let o = offsets(&shared);
    assert_eq!(o.len(), 2);
    assert_eq!(o[0], o[1]);

    let separate = compile_opts(
        source,
        CompilerOptions {
            shared_strings: false,
            ..CompilerOptions::default()
        },
    );
    let o = offsets(&separate);
    assert_eq!(o.len(), 2);
    assert_ne!(o[0], o[1]);
    assert!(separate.data.length() > shared.data.length());
}

#[test]
fn test_elsif_chain_exits() {
    let chl = compile(
        "begin script S\nx = 0\nstart\n\
         if x == 1\nx = 2\nelsif x == 2\nx = 3\nelsif x == 3\nx = 4\nelse\nx = 5\nend if\n\
         x = 6\nend script S\n",
    );
    let entry = chl.scripts.by_name("S").unwrap().instruction_address as usize;
    let end = chl.code.iter().position(|i| i.opcode == Opcode::End).unwrap();
    let code = &chl.code[entry..=end];
    let jzs: Vec<usize> = code
        .iter()
        .enumerate()
        .filter(|(_, i)| i.opcode == Opcode::Jz)
        .map(|(ip, _)| ip)
        .collect();
    assert_eq!(jzs.len(), 3);

    let exits: Vec<i32> = code
        .iter()
        .filter(|i| i.opcode == Opcode::Jmp && i.flags & flag::FORWARD == flag::FORWARD)
        .map(|i| i.int_val())
        .collect();
    // three branch exits, then the jump over the exception handlers
    assert_eq!(exits.len(), 4);
    let after_if = exits[0];
    assert!(exits[..3].iter().all(|t| *t == after_if));
    let listing = listing(&chl, "S");
    assert_eq!(listing[after_if as usize - entry], "PUSHF [x]");
    assert_eq!(listing[after_if as usize - entry + 2], "PUSHF 6.0");
}

#[test]
fn test_write_read_round_trip() {
    let source = "global g = 2\nglobal arr[3]\ndefine script Helper(a)\n\
                  begin script Main\nlocal t = 1\nstart\nrun script Helper(t)\nwait until g > 1\n\
                  run background script Helper(2)\nsay \"done\"\nend script Main\n\
                  begin script Helper(a)\nstart\nlabel again\na -= 1\nif a > 0\njump again\nend if\nend script Helper\n\
                  run script Main\n";
    let chl = compile(source);
    let bytes = chl.to_bytes().unwrap();
    let back = ChlFile::from_bytes(&bytes).unwrap();
    assert_eq!(back, chl);
    assert_eq!(back.to_bytes().unwrap(), bytes);
    assert!(back.validate().is_empty(), "{:?}", back.validate());
    assert!(back.check_code_coverage().is_empty());
    assert!(stack_check::check_file(&back).is_empty());
    assert_eq!(back.globals, vec!["g", "arr", "LHVMA", "LHVMA"]);
}

#[test]
fn test_multiple_files() {
    let mut c = Compiler::default();
    c.parse_source("global shared\nbegin script A\nstart\nshared = 1\nend script A\n", "a.txt")
        .unwrap();
    c.parse_source("begin script B\nstart\nrun script A\nshared = 2\nend script B\n", "b.txt")
        .unwrap();
    let chl = c.into_chl_file().unwrap();
    assert_eq!(chl.source_filenames(), vec!["a.txt", "b.txt"]);
    assert_eq!(chl.scripts_in("b.txt").len(), 1);
    assert_eq!(chl.scripts.by_name("B").unwrap().global_count, 1);
}

#[test]
fn test_not_implemented_is_distinct() {
    let err = compile_err("begin script S\nstart\nsay \"x\" with number 3\nend script S\n");
    match err {
        Error::Parse(e) => assert_eq!(e.kind, ParseErrorKind::NotImplemented, "{}", e),
        other => panic!("unexpected error: {}", other),
    }
    let err = compile_err("begin script S\nstart\nfoo bar\nend script S\n");
    match err {
        Error::Parse(e) => assert_ne!(e.kind, ParseErrorKind::NotImplemented, "{}", e),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_errors_carry_position() {
    let err = compile_err("global x\nbegin script S\nstart\nx = = 2\nend script S\n");
    let text = err.to_string();
    assert!(text.starts_with("test.txt:4:"), "{}", text);
}

#[test]
fn test_camera_block_required() {
    let err = compile_err("begin script S\nstart\nset game speed to 2\nend script S\n");
    assert!(err.to_string().contains("must be called within a camera block"), "{}", err);
    compile("begin script S\nstart\nbegin camera\nset game speed to 2\nend camera\nend script S\n");
}

#[test]
fn test_arity_checked_at_seal() {
    let err = compile_err(
        "begin script S\nstart\nrun script A(1, 2)\nend script S\nbegin script A(p)\nstart\nend script A\n",
    );
    assert!(matches!(err, Error::Reference(_)), "{}", err);
    assert!(err.to_string().contains("A expects 1, got 2"), "{}", err);
}

#[test]
fn test_missing_script() {
    let source = "begin script S\nstart\nrun script Ghost\nend script S\n";
    let err = compile_err(source);
    assert!(err.to_string().contains("Script not found: Ghost"), "{}", err);

    let mut c = Compiler::new(CompilerOptions {
        ignore_missing_scripts: true,
        ..CompilerOptions::default()
    });
    c.parse_source(source, "test.txt").unwrap();
    c.seal().unwrap();
    assert!(c.diagnostics().contains("script not found: Ghost"));
}

#[test]
fn test_sealed_compiler_rejects_sources() {
    let mut c = Compiler::default();
    c.parse_source("begin script S\nstart\nend script S\n", "a.txt").unwrap();
    c.seal().unwrap();
    let err = c.parse_source("begin script T\nstart\nend script T\n", "b.txt").unwrap_err();
    assert!(matches!(err, Error::Sealed));
}

#[test]
fn test_constants_from_project() {
    let project = Project::from_json(
        r#"{ "sources": ["a.txt"], "constants": {"FLAG": 7}, "options": {"first_script_id": 20} }"#,
    )
    .unwrap();
    let mut c = Compiler::new(project.options.clone());
    c.define_constants(project.constants.clone());
    c.parse_source("global constant K = FLAG\nglobal x\nbegin script S\nstart\nx = 1\nend script S\n", "a.txt")
        .unwrap();
    assert_eq!(c.constant("K"), Some(7));
    let chl = c.into_chl_file().unwrap();
    assert_eq!(chl.scripts.by_name("S").unwrap().script_id, 20);
}

#[test]
fn test_compile_files_from_disk() {
    let dir = std::env::temp_dir().join(format!("chlc-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let source = dir.join("main.txt");
    std::fs::write(&source, "begin script Main\nstart\nend script Main\nrun script Main\n").unwrap();
    let project = dir.join("project.json");
    std::fs::write(&project, r#"{ "sources": ["main.txt"], "output": "out.chl" }"#).unwrap();

    let project = Project::load(&project).unwrap();
    assert_eq!(project.sources, vec![source.clone()]);
    let mut c = Compiler::new(project.options.clone());
    for s in &project.sources {
        c.parse_file(s).unwrap();
    }
    let output = project.output.clone().unwrap();
    c.seal().unwrap().write_file(&output).unwrap();

    let chl = ChlFile::read_file(&output).unwrap();
    assert_eq!(chl.scripts.by_name("Main").unwrap().source_filename, "main.txt");
    assert_eq!(chl.autostart.len(), 1);
    std::fs::remove_dir_all(&dir).unwrap();
}
