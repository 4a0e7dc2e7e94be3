//! A software OpenGL context for tests.
//!
//! It is nowhere near a GLSL compiler. It knows just enough to behave like a driver from the
//! outside: sources with obvious syntax errors fail to compile with a line-numbered log, linking
//! matches fragment inputs against vertex outputs, uniforms that are declared but never read are
//! "optimized out", and uniform writes land in whichever program is bound. Every object is
//! tracked so tests can check that nothing leaks.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::ffi::CStr;

use crate::context::*;
use crate::stage::ShaderStage;

#[derive(Default)]
pub struct FakeGl {
    state: RefCell<State>,
}

#[derive(Default)]
struct State {
    next_id: u32,
    shaders: HashMap<ShaderId, Shader>,
    programs: HashMap<ProgramId, Program>,
    current: ProgramId,
    programs_created: usize,
    uploads: usize,
    errors: Vec<String>,
}

struct Shader {
    stage: ShaderStage,
    source: String,
    compiled: bool,
    log: String,
}

#[derive(Default)]
struct Program {
    attached: Vec<ShaderId>,
    linked: bool,
    log: String,
    locations: HashMap<String, UniformLocation>,
    values: HashMap<UniformLocation, UniformValue>,
}

impl FakeGl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_shaders(&self) -> usize {
        self.state.borrow().shaders.len()
    }

    pub fn live_programs(&self) -> usize {
        self.state.borrow().programs.len()
    }

    pub fn programs_created(&self) -> usize {
        self.state.borrow().programs_created
    }

    /// Number of `glUniform*` calls made so far, including ones aimed at location `-1`.
    pub fn uploads(&self) -> usize {
        self.state.borrow().uploads
    }

    /// Calls that a real driver would have answered with a GL error.
    pub fn errors(&self) -> Vec<String> {
        self.state.borrow().errors.clone()
    }

    pub fn uniform_value(&self, program: ProgramId, name: &str) -> Option<UniformValue> {
        let state = self.state.borrow();
        let program = state.programs.get(&program)?;
        let location = program.locations.get(name)?;
        program.values.get(location).copied()
    }
}

impl GlApi for FakeGl {
    fn create_shader(&self, stage: ShaderStage) -> ShaderId {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let id = state.next_name();
        state.shaders.insert(id, Shader {
            stage,
            source: String::new(),
            compiled: false,
            log: String::new(),
        });
        id
    }

    fn compile_shader(&self, shader: ShaderId, source: &CStr) -> bool {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        if !state.shaders.contains_key(&shader) {
            state.errors.push(format!("compile of unknown shader {}", shader));
            return false;
        }

        let shader = state.shaders.get_mut(&shader).expect("checked above");
        shader.source = source.to_string_lossy().into_owned();
        match check_syntax(&shader.source) {
            Ok(()) => {
                shader.compiled = true;
                shader.log.clear();
            }
            Err(log) => {
                shader.compiled = false;
                shader.log = log;
            }
        }

        shader.compiled
    }

    fn shader_info_log(&self, shader: ShaderId) -> String {
        self.state.borrow().shaders.get(&shader).map(|s| s.log.clone()).unwrap_or_default()
    }

    fn delete_shader(&self, shader: ShaderId) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        if state.shaders.remove(&shader).is_none() {
            state.errors.push(format!("delete of unknown shader {}", shader));
        }
    }

    fn create_program(&self) -> ProgramId {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let id = state.next_name();
        state.programs.insert(id, Program::default());
        state.programs_created += 1;
        id
    }

    fn attach_shader(&self, program: ProgramId, shader: ShaderId) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        if !state.shaders.contains_key(&shader) {
            state.errors.push(format!("attach of unknown shader {}", shader));
            return;
        }
        match state.programs.get_mut(&program) {
            Some(p) => p.attached.push(shader),
            None => state.errors.push(format!("attach to unknown program {}", program)),
        }
    }

    fn detach_shader(&self, program: ProgramId, shader: ShaderId) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        match state.programs.get_mut(&program) {
            Some(p) => p.attached.retain(|&s| s != shader),
            None => state.errors.push(format!("detach from unknown program {}", program)),
        }
    }

    fn link_program(&self, program: ProgramId) -> bool {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        if !state.programs.contains_key(&program) {
            state.errors.push(format!("link of unknown program {}", program));
            return false;
        }

        let result = state.link(&state.programs[&program].attached);

        let p = state.programs.get_mut(&program).expect("checked above");
        p.values.clear();
        match result {
            Ok(names) => {
                p.linked = true;
                p.log.clear();
                p.locations = names.into_iter()
                    .enumerate()
                    .map(|(i, name)| (name, i as UniformLocation))
                    .collect();
            }
            Err(log) => {
                p.linked = false;
                p.log = log;
                p.locations.clear();
            }
        }

        p.linked
    }

    fn program_info_log(&self, program: ProgramId) -> String {
        self.state.borrow().programs.get(&program).map(|p| p.log.clone()).unwrap_or_default()
    }

    fn delete_program(&self, program: ProgramId) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        if state.programs.remove(&program).is_none() {
            state.errors.push(format!("delete of unknown program {}", program));
        }
    }

    fn use_program(&self, program: ProgramId) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        if program != 0 && !state.programs.get(&program).map_or(false, |p| p.linked) {
            state.errors.push(format!("use of unlinked program {}", program));
            return;
        }
        state.current = program;
    }

    fn current_program(&self) -> ProgramId {
        self.state.borrow().current
    }

    fn uniform_location(&self, program: ProgramId, name: &CStr) -> UniformLocation {
        let state = self.state.borrow();
        state.programs.get(&program)
            .filter(|p| p.linked)
            .and_then(|p| p.locations.get(name.to_str().ok()?).copied())
            .unwrap_or(-1)
    }

    fn uniform(&self, location: UniformLocation, value: UniformValue) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.uploads += 1;
        if location == -1 {
            return;
        }

        let current = state.current;
        let known = state.programs.get(&current)
            .map_or(false, |p| p.locations.values().any(|&l| l == location));
        if !known {
            state.errors.push(format!("upload to location {} of program {}", location, current));
            return;
        }

        state.programs.get_mut(&current).expect("checked above").values.insert(location, value);
    }
}

impl State {
    fn next_name(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    /// Links the given shaders, returning the sorted names of the active uniforms.
    fn link(&self, attached: &[ShaderId]) -> Result<Vec<String>, String> {
        let mut vertex = None;
        let mut fragment = None;

        for id in attached {
            let shader = self.shaders.get(id).ok_or_else(|| format!("error: shader {} was deleted", id))?;
            if !shader.compiled {
                return Err(format!("error: {} shader {} is not compiled", shader.stage, id));
            }
            match shader.stage {
                ShaderStage::Vertex => vertex = Some(shader),
                ShaderStage::Fragment => fragment = Some(shader),
            }
        }

        let vertex = vertex.ok_or("error: program has no vertex shader")?;
        let fragment = fragment.ok_or("error: program has no fragment shader")?;

        let outputs = declarations(&vertex.source, "out");
        for input in declarations(&fragment.source, "in") {
            if !outputs.contains(&input) {
                return Err(format!(
                    "error: fragment shader input `{}` has no matching output in the vertex shader",
                    input.1
                ));
            }
        }

        let mut active = BTreeSet::new();
        for source in &[&vertex.source, &fragment.source] {
            for (_, name) in declarations(source, "uniform") {
                // Declared but never read: the compiler drops it
                if source.matches(name.as_str()).count() > 1 {
                    active.insert(name);
                }
            }
        }

        Ok(active.into_iter().collect())
    }
}

/// `(type, name)` of every line that reads `<qualifier> <type> <name>;`.
fn declarations(source: &str, qualifier: &str) -> Vec<(String, String)> {
    source.lines()
        .filter_map(|line| {
            let mut words = line.trim().trim_end_matches(';').split_whitespace();
            if words.next()? != qualifier {
                return None;
            }
            Some((words.next()?.to_owned(), words.next()?.to_owned()))
        })
        .collect()
}

fn check_syntax(source: &str) -> Result<(), String> {
    if !source.trim_start().starts_with("#version") {
        return Err("0:1(1): error: #version directive must come first".to_owned());
    }
    if !source.contains("void main") {
        return Err("error: no function with name 'main'".to_owned());
    }

    for (number, line) in source.lines().enumerate() {
        let line = line.trim();
        let complete = line.is_empty()
            || line.starts_with("//")
            || line.starts_with('#')
            || line.starts_with("void ")
            || line.ends_with(';')
            || line.ends_with('{')
            || line.ends_with('}');

        if !complete {
            return Err(format!("0:{}(1): error: syntax error, unexpected end of line, expecting ';'", number + 1));
        }
    }

    let balanced = |open, close| source.matches(open).count() == source.matches(close).count();
    if !balanced('{', '}') || !balanced('(', ')') {
        return Err("error: syntax error, unbalanced brackets".to_owned());
    }

    Ok(())
}
