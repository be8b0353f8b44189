use crate::bytecode::ir::FrameTemplate;

/// One line per instruction: `<index>: <OPCODE> <operand> ; <comment>`.
pub fn disassemble(template: &FrameTemplate) -> String {
    let mut output = String::new();
    for (ip, instr) in template.instrs.iter().enumerate() {
        output.push_str(&format!("{}: {}\n", ip, instr));
    }
    output
}

/// Print disassembly of every template, `main` first and the rest by name.
pub fn print_templates(templates: &[FrameTemplate]) {
    print!("{}", render_templates(templates));
}

pub fn render_templates(templates: &[FrameTemplate]) -> String {
    let mut sorted: Vec<&FrameTemplate> = templates.iter().collect();
    sorted.sort_by_key(|t| (t.name != "main", t.name.clone()));

    let mut output = String::from("=== BYTECODE PROGRAM ===\n\n");
    for template in sorted {
        output.push_str(&render_template(template));
        output.push('\n');
    }
    output
}

/// A single template with a header and `►` markers on jump targets.
pub fn render_template(template: &FrameTemplate) -> String {
    let targets = template.jump_targets();
    let is_target = |ip: usize| targets.iter().any(|&t| t >= 0 && t as usize == ip);

    let mut output = String::new();
    output.push_str("════════════════════════════════════════\n");
    output.push_str(&format!(" {}\n", template.name));
    output.push_str(&format!(" {} instructions\n", template.len()));
    output.push_str("════════════════════════════════════════\n");

    for (ip, instr) in template.instrs.iter().enumerate() {
        if is_target(ip) {
            output.push_str("      ┌──────────────────────────────────\n");
        }
        let marker = if is_target(ip) { "► " } else { "  " };
        output.push_str(&format!("{:04} {}{}\n", ip, marker, instr));
    }
    if is_target(template.len()) {
        output.push_str(&format!("{:04} ► (end)\n", template.len()));
    }

    output
}

/// Pretty-printed JSON of the templates, for tooling. Never read back.
pub fn templates_to_json(templates: &[FrameTemplate]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(templates)
}
