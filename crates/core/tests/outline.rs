use mdxwiki_core::{OutlineEntry, export, import, outline, outline_of};
use pretty_assertions::assert_eq;

const GUIDE: &str = "---
title: Guide
---

# Guide

Intro text.

## Install {#install}

<Tabs defaultValue=\"npm\">
<TabsList>
<TabsTrigger value=\"npm\">npm</TabsTrigger>
</TabsList>
<TabsContent value=\"npm\">
### With `npm`
</TabsContent>
</Tabs>

```md
## Not a heading
```

## Install

<Accordions type=\"single\">
<Accordion title=\"FAQ\">
#### Why *this*?
</Accordion>
</Accordions>
";

#[test]
fn text_and_tree_outlines_agree() {
    let from_text = outline(GUIDE);
    assert_eq!(from_text, outline_of(&import(GUIDE)));

    let anchors: Vec<&str> = from_text.iter().map(|e| e.anchor.as_str()).collect();
    assert_eq!(anchors, vec!["guide", "install", "with-npm", "install-1", "why-this"]);
    assert_eq!(
        from_text[2],
        OutlineEntry {
            title: "With npm".to_string(),
            anchor: "with-npm".to_string(),
            depth: 3,
        }
    );
}

#[test]
fn outline_is_stable_across_export() {
    let tree = import(GUIDE);
    assert_eq!(outline(&export(&tree)), outline_of(&tree));
}
