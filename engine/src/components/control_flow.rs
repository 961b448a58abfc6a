/// Conditional and list rendering demo.
#[derive(Debug, Clone, Default)]
pub struct ControlFlowExample {
    condition: bool,
    items: Vec<String>,
}

impl ControlFlowExample {
    #[must_use]
    pub fn new() -> Self {
        Self {
            condition: false,
            items: ["a", "b", "c"].map(String::from).to_vec(),
        }
    }

    pub fn set_condition(&mut self, condition: bool) {
        self.condition = condition;
    }

    pub fn set_items(&mut self, items: Vec<String>) {
        self.items = items;
    }

    #[must_use]
    pub fn render(&self) -> Vec<String> {
        let mut lines = vec!["Control Flow Syntax - if".to_string()];
        // The branch binds the negated condition.
        let result = !self.condition;
        if result {
            lines.push(format!("condition is {result}"));
        } else {
            lines.push("condition is false".to_string());
        }

        lines.push("Control Flow Syntax - for".to_string());
        if self.items.is_empty() {
            lines.push("The provided list is empty.".to_string());
        } else {
            lines.extend(self.items.iter().map(|item| format!("- {item}")));
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_render() {
        assert_eq!(
            ControlFlowExample::new().render(),
            vec![
                "Control Flow Syntax - if",
                "condition is true",
                "Control Flow Syntax - for",
                "- a",
                "- b",
                "- c",
            ]
        );
    }

    #[test]
    fn true_condition_takes_else_branch() {
        let mut example = ControlFlowExample::new();
        example.set_condition(true);
        assert_eq!(example.render()[1], "condition is false");
    }

    #[test]
    fn empty_list_placeholder() {
        let mut example = ControlFlowExample::new();
        example.set_items(Vec::new());
        assert_eq!(example.render()[3], "The provided list is empty.");
    }
}
