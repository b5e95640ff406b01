use crate::{license::License, template::TemplateTree};
use colored::Colorize;

pub const CMD_STR: &str = "list";

pub fn list(template: &TemplateTree) {
    println!(
        "{} {}",
        "Template:".bold(),
        template.root().to_string_lossy()
    );
    if !template.exists() {
        println!("  {}", "Template directory not found.".red());
    } else {
        let discovered = template.scan_pcb_templates();
        if discovered.is_empty() {
            println!("  {}", "No PCB templates found.".italic());
        }
        for pcb in discovered {
            println!("  {}\n    {}", pcb.short_name().bold(), pcb);
        }
    }

    println!();
    println!("{}", "Licenses:".bold());
    for license in License::ALL.iter() {
        println!("  {:<14} {}", license.key().yellow(), license.name());
    }
}
