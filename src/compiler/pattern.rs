use crate::{
    common::span::Spanned,
    compiler::{ast::Pattern, defs::MatcherDefs, error::CompileError, gen::Compiler},
    runtime::{list, matcher},
    wasm::ir::{Instr, Local},
};

const NEXT: &str = "next";

impl Compiler {
    /// Compiles a pattern into a matcher function, returning its name.
    /// Sub-patterns get matchers of their own, defined first.
    pub fn pattern(&mut self, pattern: &Spanned<Pattern>) -> Result<String, CompileError> {
        self.context.use_matcher();
        self.context.matchers.enter();

        let primitive = |name: &str| vec![
            Instr::local_get(MatcherDefs::ENV),
            Instr::local_get(MatcherDefs::VALUE),
            Instr::call(name),
        ];

        let body = match &pattern.item {
            Pattern::Wildcard => primitive(matcher::WILDCARD),
            Pattern::Nil      => primitive(matcher::EMPTY_LIST),
            Pattern::Ident(_) => primitive(matcher::IDENTIFIER),
            // the head extends the environment first,
            // and the tail extends whatever the head produced
            Pattern::Cons(head, tail) => {
                let head = self.pattern(head)?;
                let tail = self.pattern(tail)?;
                self.context.matchers.declare(Local::i32(NEXT));

                let tail_match = vec![
                    Instr::local_get(NEXT),
                    Instr::local_get(MatcherDefs::VALUE),
                    Instr::call(list::TAIL),
                    Instr::Call(tail),
                ];

                vec![
                    Instr::local_get(MatcherDefs::VALUE),
                    Instr::call(list::IS_EMPTY),
                    Instr::if_i32(
                        vec![Instr::I32Const(matcher::FAILURE)],
                        vec![
                            Instr::local_get(MatcherDefs::ENV),
                            Instr::local_get(MatcherDefs::VALUE),
                            Instr::call(list::HEAD),
                            Instr::Call(head),
                            Instr::local_tee(NEXT),
                            Instr::if_i32(tail_match, vec![Instr::I32Const(matcher::FAILURE)]),
                        ],
                    ),
                ]
            },
        };

        Ok(self.context.matchers.leave(body))
    }
}
