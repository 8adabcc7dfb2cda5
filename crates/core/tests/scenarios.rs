use insta::assert_snapshot;
use mdxwiki_core::{
    Attrs, CalloutType, Document, ImportOptions, ImportWarning, Mark, Node, NodeKind, NodePath,
    export, import, import_with_options,
};
use pretty_assertions::assert_eq;

#[test]
fn callout_keeps_its_type_and_text() {
    let text = "<Callout type=\"warning\">Be careful</Callout>";
    let doc = import(text);
    assert_eq!(
        doc,
        Node::doc(vec![Node::callout(
            CalloutType::Warning,
            vec![Node::paragraph_text("Be careful")]
        )])
    );
    assert_eq!(export(&doc), format!("{text}\n"));
}

#[test]
fn table_with_header_and_two_rows() {
    let text = "|Name|Age|\n|:---|---:|\n|Ann|31|\n|Bob|42|\n";
    let doc = import(text);
    let table = &doc.children[0];
    assert_eq!(table.kind(), NodeKind::Table);
    assert_eq!(table.children.len(), 3);

    let kinds = |row: &Node| row.children.iter().map(Node::kind).collect::<Vec<_>>();
    assert_eq!(
        kinds(&table.children[0]),
        vec![NodeKind::TableHeader, NodeKind::TableHeader]
    );
    for row in &table.children[1..] {
        assert_eq!(kinds(row), vec![NodeKind::TableCell, NodeKind::TableCell]);
    }

    assert_snapshot!(export(&doc), @r"
    | Name | Age |
    | --- | --- |
    | Ann | 31 |
    | Bob | 42 |
    ");
}

#[test]
fn nested_emphasis_keeps_its_order() {
    let text = "**bold *and italic* text**";
    let doc = import(text);
    assert_eq!(
        doc.children[0],
        Node::paragraph(vec![
            Node::marked_text("bold ", vec![Mark::Bold]),
            Node::marked_text("and italic", vec![Mark::Bold, Mark::Italic]),
            Node::marked_text(" text", vec![Mark::Bold]),
        ])
    );
    assert_eq!(export(&doc), format!("{text}\n"));
}

#[test]
fn missing_tab_content_is_not_an_error_and_orphans_are_marked() {
    let text = "<Tabs defaultValue=\"tab1\">
<TabsList>
<TabsTrigger value=\"tab1\">One</TabsTrigger>
<TabsTrigger value=\"tab2\">Two</TabsTrigger>
</TabsList>
<TabsContent value=\"tab1\">First panel</TabsContent>
</Tabs>
";
    let outcome = import_with_options(text, &ImportOptions::default());
    assert!(outcome.diagnostics.is_empty());

    let tabs = &outcome.doc.children[0];
    assert_eq!(tabs.kind(), NodeKind::TabsContainer);
    assert_eq!(tabs.children.len(), 2);
    assert_eq!(
        tabs.children[1].attrs,
        Attrs::TabsContent {
            value: "tab1".into()
        }
    );

    let mut doc = Document::from(outcome.doc);
    let tabs_path = NodePath::from(vec![0]);
    doc.insert_child(
        &tabs_path,
        2,
        Node::tabs_content("tab3", vec![Node::paragraph_text("Third")]),
    )
    .unwrap();
    assert_eq!(doc.orphaned_tab_contents(), vec![NodePath::from(vec![0, 2])]);

    let exported = export(doc.root());
    assert_snapshot!(exported, @r#"
    <Tabs defaultValue="tab1">
    <TabsList>
    <TabsTrigger value="tab1">One</TabsTrigger>
    <TabsTrigger value="tab2">Two</TabsTrigger>
    </TabsList>
    <TabsContent value="tab1">First panel</TabsContent>
    {/* orphaned: no TabsTrigger with value "tab3" */}
    <TabsContent value="tab3">Third</TabsContent>
    </Tabs>
    "#);

    let reimported = import_with_options(&exported, &ImportOptions::default());
    assert_eq!(&reimported.doc, doc.root());
    assert!(matches!(
        reimported.diagnostics.warnings.as_slice(),
        [ImportWarning::OrphanedReference { value, .. }] if value == "tab3"
    ));
}
