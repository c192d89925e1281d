use anyhow::Result;

use crate::load::Sources;

pub fn execute(sources: &Sources) -> Result<()> {
    let loaded = sources.load()?;
    loaded.config.validate()?;
    let stats = loaded.bank.stats();

    println!("{} questions", stats.total);
    for section in loaded.registry.sections() {
        let in_section = stats.per_section.get(&section).copied().unwrap_or(0);
        println!("\n{section}: {in_section} questions");
        println!("  {:<8} {:>5} {:>5} {:>5} {:>6}  label", "area", "easy", "med", "hard", "weight");
        for area in loaded.registry.areas(section).unwrap_or_default() {
            let counts = stats.per_area.get(&area.code).cloned().unwrap_or_default();
            println!(
                "  {:<8} {:>5} {:>5} {:>5} {:>5.1}%  {}",
                area.code,
                counts.easy,
                counts.medium,
                counts.hard,
                area.midpoint(),
                area.label,
            );
        }
    }
    Ok(())
}
