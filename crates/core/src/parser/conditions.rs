use super::*;

impl<'a> Parser<'a> {
    pub(super) fn parse_condition_list(&mut self) -> PResult<Vec<Cond>> {
        self.parse_list(|p| p.parse_condition())
    }

    /// `X on Y`, `X ei ole Y`, `X on suurempi kuin Y`, `X on vähintään Y`.
    ///
    /// Quantifiers introduced inside the condition wrap it as `ForAll` or
    /// `Exists`, the first one outermost.
    pub(super) fn parse_condition(&mut self) -> PResult<Cond> {
        let before = self.quantifiers.len();
        let left = self.parse_nominal_phrase()?;
        let negated = if self.accept("on") || self.accept("ovat") {
            false
        } else if self.peek_is(1, "ei") || self.peek_is(1, "eivät") {
            self.advance(Style::Keyword);
            self.expect("ole")?;
            true
        } else {
            return Err(self.unexpected("'on' or 'ei ole'"));
        };

        let span = self.span_here();
        let comparative = self
            .peek(1)
            .filter(|t| !is_reserved(t))
            .and_then(|t| t.find(|a| a.is_comparative()))
            .cloned();
        let mut cond = if let Some(adj) = comparative {
            self.advance(Style::Keyword);
            self.expect("kuin")?;
            let right = self.parse_nominal_phrase()?;
            match adj.base.as_str() {
                "suuri" => compare(negated, CmpOp::Gt, left.expr, right.expr),
                "pieni" => compare(negated, CmpOp::Lt, left.expr, right.expr),
                _ => Cond::UserCompare {
                    negated,
                    name: adj.base,
                    left: left.expr,
                    right: right.expr,
                    span,
                },
            }
        } else if self.accept("vähintään") {
            let right = self.parse_nominal_phrase()?;
            compare(negated, CmpOp::Ge, left.expr, right.expr)
        } else if self.accept("enintään") {
            let right = self.parse_nominal_phrase()?;
            compare(negated, CmpOp::Le, left.expr, right.expr)
        } else {
            let right = self.parse_nominal_phrase()?;
            compare(negated, CmpOp::Eq, left.expr, right.expr)
        };

        for q in self.quantifiers.split_off(before).into_iter().rev() {
            self.referents.retain(|r| r.name != q.var);
            cond = if q.universal {
                Cond::ForAll {
                    var: q.var,
                    collection: q.collection,
                    cond: Box::new(cond),
                }
            } else {
                Cond::Exists {
                    var: q.var,
                    collection: q.collection,
                    cond: Box::new(cond),
                }
            };
        }
        Ok(cond)
    }
}

fn compare(negated: bool, op: CmpOp, left: Expr, right: Expr) -> Cond {
    Cond::Compare {
        negated,
        op,
        left,
        right,
    }
}
