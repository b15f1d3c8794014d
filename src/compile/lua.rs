//! Lua script emitter for the DeSmuME scripting interface.
//!
//! Uses `memory.writebyte`, `stylus.set`, `emu.framecount` and
//! `emu.frameadvance`. Integer division goes through `math.floor` since
//! the interpreter is Lua 5.1.

use super::program::{Corner, FrameUnit};
use super::{ControlProgram, RedrawTrigger};

/// Renders a [`ControlProgram`] as script text.
pub trait ScriptEmitter {
    fn emit(&self, program: &ControlProgram) -> String;
}

/// Emits a DeSmuME Lua script.
#[derive(Debug, Clone, Copy, Default)]
pub struct LuaEmitter;

impl LuaEmitter {
    pub fn new() -> Self {
        Self
    }
}

/// Global holding the correction value for `corner`.
fn held_variable(corner: Corner) -> &'static str {
    match corner {
        Corner::Last => "br1",
        Corner::SecondLast => "br2",
    }
}

fn unit_name(frame: u64) -> String {
    format!("f{frame}")
}

struct Script {
    lines: Vec<String>,
}

impl Script {
    fn line(&mut self, indent: usize, text: impl AsRef<str>) {
        let mut line = "  ".repeat(indent);
        line.push_str(text.as_ref());
        self.lines.push(line);
    }

    fn blank(&mut self) {
        self.lines.push(String::new());
    }
}

impl ScriptEmitter for LuaEmitter {
    fn emit(&self, program: &ControlProgram) -> String {
        let mut script = Script { lines: Vec::new() };
        let options = program.options();
        let correct = options.backbuffer_correction;

        if let Some(noise) = program.noise() {
            emit_noise(&mut script, program, noise.max_value, correct);
            script.blank();
        }

        for unit in program.units() {
            emit_unit(&mut script, unit);
            script.blank();
        }

        script.line(0, "local frames = {");
        for unit in program.units() {
            script.line(1, format!("[{}] = {},", unit.frame, unit_name(unit.frame)));
        }
        script.line(0, "}");
        script.blank();

        emit_main_loop(&mut script, program);
        script.lines.join("\n")
    }
}

fn emit_noise(script: &mut Script, program: &ControlProgram, max_value: u8, correct: bool) {
    let profile = program.profile();
    script.line(0, "function noise()");
    script.line(1, format!("for y = 0, {} do", profile.height - 1));
    script.line(2, format!("for x = 0, {} do", profile.width - 1));
    script.line(
        3,
        format!(
            "memory.writebyte({:#x} + y * {} + x, math.random(1, {max_value}))",
            profile.base_address, profile.width
        ),
    );
    script.line(2, "end");
    script.line(1, "end");
    if correct {
        for corner in Corner::ALL {
            script.line(1, format!("{} = math.random(1, {max_value})", held_variable(corner)));
        }
    }
    script.line(0, "end");
}

fn emit_unit(script: &mut Script, unit: &FrameUnit) {
    script.line(0, format!("{} = function()", unit_name(unit.frame)));
    for write in &unit.writes {
        script.line(1, format!("memory.writebyte({:#x}, {})", write.address, write.value));
    }
    for (corner, value) in &unit.corrections {
        script.line(1, format!("{} = {value}", held_variable(*corner)));
    }
    script.line(0, "end");
}

fn emit_main_loop(script: &mut Script, program: &ControlProgram) {
    let options = program.options();
    let settle = options.settle_in_frames;
    let first = program.first_content_index();
    let [touch_x, touch_y] = program.profile().touch_origin_px;
    let pulse = options.redraw_trigger == RedrawTrigger::PulseThenTouch;

    script.line(0, "local phase = 0");
    script.line(0, "local last = -1");
    if pulse {
        script.line(0, "local pressed = false");
    }
    if options.backbuffer_correction {
        for corner in Corner::ALL {
            script.line(0, format!("{} = 0", held_variable(corner)));
        }
    }
    script.line(0, "local start = emu.framecount()");
    script.line(0, "while true do");
    script.line(
        1,
        format!(
            "local current = math.floor((emu.framecount() - start) / {})",
            options.speed_divisor
        ),
    );

    if program.noise().is_some() {
        script.line(1, format!("if current <= {settle} then"));
        script.line(2, "noise()");
        script.line(1, "elseif current ~= last then");
    } else {
        script.line(1, format!("if current > {settle} and current ~= last then"));
    }
    script.line(2, format!("local unit = frames[current - {first}]"));
    script.line(2, "if unit then");
    if options.log_frames {
        script.line(3, format!("print(\"Playing frame\", current - {first})"));
    }
    script.line(3, "unit()");
    script.line(2, "end");
    script.line(1, "end");
    script.line(1, "last = current");

    // Each touch advances the touched cell by one color, so the corrected
    // corner is rewritten one color behind right before the touch.
    let mut indent = 1;
    if pulse {
        script.line(1, "pressed = not pressed");
        script.line(1, "if pressed then");
        indent = 2;
    }
    script.line(indent, format!("phase = phase + {}", options.phase_step));
    script.line(
        indent,
        format!("if phase >= {} then phase = 0 end", options.phase_period),
    );
    if options.backbuffer_correction {
        script.line(indent, format!("if phase >= {} then", options.phase_midpoint()));
        script.line(
            indent + 1,
            format!(
                "memory.writebyte({:#x}, {})",
                program.corner_address(Corner::Last),
                held_variable(Corner::Last)
            ),
        );
        script.line(indent, "else");
        script.line(
            indent + 1,
            format!(
                "memory.writebyte({:#x}, {})",
                program.corner_address(Corner::SecondLast),
                held_variable(Corner::SecondLast)
            ),
        );
        script.line(indent, "end");
    }
    script.line(
        indent,
        format!("stylus.set{{x = {touch_x} + phase, y = {touch_y}, touch = true}}"),
    );
    if pulse {
        script.line(1, "else");
        script.line(2, "stylus.set{touch = false}");
        script.line(1, "end");
    }
    script.line(1, "emu.frameadvance()");
    script.line(0, "end");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::{Compiler, CompilerOptions};
    use crate::config::TargetProfile;
    use crate::diff::{DiffMap, PixelChange};

    fn program(options: CompilerOptions) -> ControlProgram {
        let diffs: DiffMap = [
            (0, vec![PixelChange::new(0, 0, 0), PixelChange::new(23, 19, 1)]),
            (4, vec![PixelChange::new(1, 0, 3)]),
        ]
        .into_iter()
        .collect();
        Compiler::new(TargetProfile::default(), options)
            .compile(&diffs)
            .unwrap()
    }

    #[test]
    fn test_frame_units_and_table() {
        let script = LuaEmitter::new().emit(&program(CompilerOptions::default()));

        assert!(script.contains("f0 = function()\n  memory.writebyte(0x238f9e8, 1)\n"));
        assert!(script.contains("  memory.writebyte(0x238fbc7, 2)\n  br1 = 1\nend"));
        assert!(script.contains("f4 = function()\n  memory.writebyte(0x238f9e9, 4)\nend"));
        assert!(script.contains("local frames = {\n  [0] = f0,\n  [4] = f4,\n}"));
    }

    #[test]
    fn test_main_loop_timing() {
        let script = LuaEmitter::new().emit(&program(CompilerOptions::default()));

        assert!(script.contains("local current = math.floor((emu.framecount() - start) / 2)"));
        assert!(script.contains("if current <= 30 then\n    noise()\n  elseif current ~= last then"));
        assert!(script.contains("local unit = frames[current - 31]"));
        assert!(script.contains("print(\"Playing frame\", current - 31)"));
        assert!(script.contains("if phase >= 16 then phase = 0 end"));
        assert!(script.contains("if phase >= 8 then\n    memory.writebyte(0x238fbc7, br1)"));
        assert!(script.contains("memory.writebyte(0x238fbc6, br2)"));
        assert!(script.contains("stylus.set{x = 192 + phase, y = 168, touch = true}"));
        assert!(script.ends_with("  emu.frameadvance()\nend"));
    }

    #[test]
    fn test_noise_function() {
        let script = LuaEmitter::new().emit(&program(CompilerOptions::default()));
        assert!(script.starts_with("function noise()\n  for y = 0, 19 do\n    for x = 0, 23 do\n"));
        assert!(script.contains("memory.writebyte(0x238f9e8 + y * 24 + x, math.random(1, 3))"));
        assert!(script.contains("  br1 = math.random(1, 3)\n  br2 = math.random(1, 3)\nend"));
    }

    #[test]
    fn test_without_noise_or_correction() {
        let options = CompilerOptions {
            noise: false,
            backbuffer_correction: false,
            log_frames: false,
            ..Default::default()
        };
        let script = LuaEmitter::new().emit(&program(options));

        assert!(!script.contains("noise"));
        assert!(!script.contains("br1"));
        assert!(!script.contains("print("));
        assert!(script.contains("if current > 30 and current ~= last then"));
    }

    #[test]
    fn test_pulse_then_touch() {
        let options = CompilerOptions {
            redraw_trigger: RedrawTrigger::PulseThenTouch,
            ..Default::default()
        };
        let script = LuaEmitter::new().emit(&program(options));

        assert!(script.contains("local pressed = false"));
        assert!(script.contains("  pressed = not pressed\n  if pressed then\n    phase = phase + 4"));
        assert!(script.contains("  else\n    stylus.set{touch = false}\n  end"));
    }
}
