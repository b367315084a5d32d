use super::*;

impl<'a> Parser<'a> {
    /// `A, B, C ja D` or `A, B eikä mitään muuta`.
    ///
    /// Separators are tentative: when the item after a `,` or `ja` does not
    /// parse, the separator is left for the enclosing production and the
    /// item's error is kept in case the declaration fails anyway.
    pub(super) fn parse_list<T>(
        &mut self,
        mut item: impl FnMut(&mut Self) -> PResult<T>,
    ) -> PResult<Vec<T>> {
        let mut items = vec![item(self)?];
        loop {
            if self.peek_is(1, "eikä") && self.peek_is(2, "mitään") && self.peek_is(3, "muuta") {
                for _ in 0..3 {
                    self.advance(Style::Keyword);
                }
                break;
            }
            let mark = self.mark();
            let last = if self.accept_punct(",") {
                self.accept("ja")
            } else if self.accept("ja") {
                true
            } else {
                break;
            };
            match item(self) {
                Ok(v) => items.push(v),
                Err(e) => {
                    self.abandon(e);
                    self.rewind(mark);
                    break;
                }
            }
            if last {
                break;
            }
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::parse_ok;
    use super::*;

    fn list_len(src: &str) -> usize {
        match &parse_ok(src)[0].kind {
            DeclKind::Variable { value, .. } => match &value.kind {
                ExprKind::List(items) => items.len(),
                other => panic!("expected list, got {:?}", other),
            },
            other => panic!("expected variable, got {:?}", other),
        }
    }

    #[test]
    fn ja_ends_the_list() {
        assert_eq!(list_len("Olkoon a lista, jonka alkiot ovat 1, 2, 3 ja 4."), 4);
        assert_eq!(list_len("Olkoon a lista, jonka alkiot ovat 1 ja 2."), 2);
    }

    #[test]
    fn eika_mitaan_muuta_ends_the_list() {
        assert_eq!(list_len("Olkoon a lista, jonka alkiot ovat 1 eikä mitään muuta."), 1);
        assert_eq!(list_len("Olkoon a lista, jonka alkiot ovat 1, 2 eikä mitään muuta."), 2);
    }

    #[test]
    fn failed_item_leaves_separator_for_caller() {
        let decls = parse_ok(
            "Olkoon a lista, jonka alkiot ovat 1, 2, minkä jälkeen tulostetaan a.",
        );
        assert_eq!(decls[0].additional.len(), 1);
    }

    #[test]
    fn failing_item_error_is_reported_over_the_separator() {
        let unit = super::super::tests::parse(
            "Kun tulostetaan luku, tulostetaan 1 ja jos 1 on, tulostetaan 2.",
        );
        assert_eq!(unit.diagnostics.len(), 1, "{:?}", unit.diagnostics);
        let d = &unit.diagnostics[0];
        assert!(d.message.starts_with("unexpected ','"), "{}", d.message);
        assert_eq!(d.column, 48);
    }
}
