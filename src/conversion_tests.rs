//! End-to-end conversion scenarios over whole modules.

use crate::config::ConvertOptions;
use crate::convert::{convert_source, ConversionOutput};
use crate::diagnostics::{
    PL_WARN_COMPLEX_OBSERVER, PL_WARN_DIRECTIVE_CONDITION, PL_WARN_EXPORT_SHAPE, PL_WARN_OBSERVERS_ACCESSOR,
};
use pretty_assertions::assert_eq;
use std::path::Path;

fn unformatted() -> ConvertOptions {
    ConvertOptions {
        format: false,
        ..Default::default()
    }
}

fn convert_with(source: &str, options: &ConvertOptions) -> ConversionOutput {
    convert_source(source, Path::new("src/component.js"), options).unwrap()
}

fn convert(source: &str) -> ConversionOutput {
    convert_with(source, &unformatted())
}

fn squash(code: &str) -> String {
    code.chars().filter(|c| !c.is_whitespace()).collect()
}

fn codes(output: &ConversionOutput) -> Vec<&str> {
    output.diagnostics.iter().map(|d| d.code.as_str()).collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// WHOLE MODULES
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_two_way_component_module() {
    let source = r#"import { html, PolymerElement } from '@polymer/polymer/polymer-element.js';

class NameCard extends PolymerElement {
  static get template() {
    return html`<paper-input value="{{name}}"></paper-input>`;
  }
}
"#;
    let output = convert(source);
    assert_eq!(
        output.code,
        r#"import { html, LitElement, css } from "lit";

class NameCard extends LitElement {
  render() {
    return html`<paper-input .value="${this.name}" @value-changed="${(e) => (this.name = e.target.value)}"></paper-input>`;
  }
}
"#
    );
    assert!(output.diagnostics.is_empty());
    assert_eq!(output.classes[0].name, "NameCard");
}

#[test]
fn test_reflected_boolean_property() {
    let source = r#"import { PolymerElement } from '@polymer/polymer/polymer-element.js';

class ToggleButton extends PolymerElement {
  static get properties() {
    return {
      active: {type: Boolean, value: true, reflectToAttribute: true}
    };
  }
}
customElements.define('toggle-button', ToggleButton);
"#;
    let output = convert(source);
    let code = squash(&output.code);
    assert!(code.contains("active:{type:Boolean,reflect:true}"));
    assert!(code.contains("constructor(){super();this.active=true;}"));
    assert!(!output.code.contains("@polymer/polymer"));
    assert!(output.code.contains("customElements.define('toggle-button', ToggleButton);"));
    assert_eq!(output.classes[0].initialized, vec!["active"]);
}

#[test]
fn test_full_component() {
    let source = r#"import { html, PolymerElement } from '@polymer/polymer/polymer-element.js';
import '@polymer/polymer/lib/elements/dom-if.js';
import '@polymer/polymer/lib/elements/dom-repeat.js';
import '@vaadin/vaadin-grid';

export class PeopleList extends PolymerElement {
  static get is() {
    return 'people-list';
  }

  static get template() {
    return html`
      <style include="shared-styles">
        :host { display: block; }
      </style>
      <template is="dom-if" if="[[!loggedIn]]"><a href="/login">Login</a></template>
      <template is="dom-repeat" items="[[people]]"><span title$="[[item.title]]">[[item.name]] ([[index]])</span></template>
      <vaadin-grid items="[[people]]">
        <vaadin-grid-column>
          <template class="header">Name</template>
          <template>[[item.name]]</template>
        </vaadin-grid-column>
      </vaadin-grid>
      <button on-click="_refresh" disabled$="[[busy]]">Refresh</button>
    `;
  }

  static get properties() {
    return {
      people: { type: Array, value: () => [] },
      count: { type: Number, computed: '_count(people)' },
      busy: { type: Boolean, observer: '_busyChanged' }
    };
  }

  ready() {
    super.ready();
    this.$.grid.clearCache();
  }
}
"#;
    let output = convert(source);
    let code = &output.code;

    assert!(code.starts_with(
        "import { html, LitElement, css } from \"lit\";\nimport { unsafeCSS } from \"lit\";\nimport { columnBodyRenderer, columnHeaderRenderer } from \"@vaadin/grid/lit.js\";\n"
    ));
    assert!(!code.contains("dom-if.js"));
    assert!(!code.contains("dom-repeat.js"));
    assert!(code.contains("import '@vaadin/vaadin-grid';"));
    assert!(code.contains("export class PeopleList extends LitElement {"));

    assert!(code.contains("static get styles() {"));
    assert!(code.contains("unsafeCSS(includedStyles[\"shared-styles\"])"));
    assert!(code.contains(":host { display: block; }"));
    assert!(!code.contains("<style"));

    assert!(code.contains("? html`<a href=\"/login\">Login</a>` : html``}"));
    assert!(code.contains(
        "${((this.people) ? this.people : []).map((item, index) => html`<span title=\"${item.title}\">${item.name} (${index})</span>`)}"
    ));
    assert!(code.contains("<vaadin-grid .items=\"${this.people}\">"));
    assert!(code.contains("${columnHeaderRenderer((column) => html`Name`)}"));
    assert!(code.contains("${columnBodyRenderer((item) => html`${item.name}`)}"));
    assert!(code.contains("@click=\"${this._refresh}\""));
    assert!(code.contains("?disabled=\"${this.busy}\""));

    assert!(code.contains("get count() {\n    return (this._count)(this.people);\n  }"));
    assert!(code.contains("set busy(newValue) {"));
    assert!(code.contains("this._busyChanged(newValue, oldValue);"));
    assert!(code.contains("this.people = [];"));

    assert!(code.contains("firstUpdated(_changedProperties) {\n    super.firstUpdated(_changedProperties);"));
    assert!(code.contains("this.renderRoot.querySelector(\"#grid\").clearCache();"));

    let class = &output.classes[0];
    assert_eq!(class.tag.as_deref(), Some("people-list"));
    assert_eq!(class.computed, vec!["count"]);
    assert_eq!(class.observed, vec!["busy"]);
    assert!(output.usage.uses_unsafe_style_include);
    assert!(output.usage.uses_body_renderer && output.usage.uses_header_renderer);
    assert!(!output.usage.uses_repeat);
    assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);
}

// ═══════════════════════════════════════════════════════════════════════════════
// MODULE SHAPES
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_default_export_with_mixin() {
    let source = "import { PolymerElement } from '@polymer/polymer';\nimport { ThemableMixin } from './themable.js';\nexport default class Fancy extends ThemableMixin(PolymerElement) {}\n";
    let output = convert(source);
    assert!(output
        .code
        .contains("export default class Fancy extends ThemableMixin(LitElement) {}"));
    assert!(output.code.contains("import { ThemableMixin } from './themable.js';"));
}

#[test]
fn test_non_class_export_is_reported() {
    let source = "import { PolymerElement } from '@polymer/polymer';\nexport const VERSION = '1';\nclass A extends PolymerElement {}\n";
    let output = convert(source);
    assert_eq!(codes(&output), vec![PL_WARN_EXPORT_SHAPE]);
    let diagnostic = &output.diagnostics[0];
    assert_eq!(diagnostic.file, "src/component.js");
    assert_eq!(diagnostic.line, 2);
    assert!(output.code.contains("export const VERSION = '1';"));
}

#[test]
fn test_module_without_legacy_class_is_unchanged() {
    let source = "// extends PolymerElement elsewhere\nimport { PolymerElement } from '@polymer/polymer';\nexport const Mixin = (base) => base;\n";
    let output = convert(source);
    assert!(!output.converted());
    assert_eq!(output.code, source);
}

#[test]
fn test_light_dom_component() {
    let source = "import { PolymerElement } from '@polymer/polymer';\nclass A extends PolymerElement {\n  _attachDom(dom) {\n    this.appendChild(dom);\n  }\n}\n";
    let output = convert(source);
    assert!(output
        .code
        .contains("createRenderRoot() {\n    // Do not use a shadow root\n    return this;\n  }"));
}

// ═══════════════════════════════════════════════════════════════════════════════
// OPTIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_legacy_imports_and_keyed_repeat() {
    let options = ConvertOptions {
        legacy_imports: true,
        repeat_directive: true,
        format: false,
        ..Default::default()
    };
    let source = "import { html, PolymerElement } from '@polymer/polymer';\nclass A extends PolymerElement {\n  static get template() {\n    return html`<dom-repeat items=\"[[rows]]\"><template><p>[[item]]</p></template></dom-repeat>`;\n  }\n}\n";
    let output = convert_with(source, &options);
    assert!(output.code.starts_with(
        "import { html, LitElement, css } from \"lit-element\";\nimport { repeat } from \"lit-html/directives/repeat.js\";\n"
    ));
    assert!(output
        .code
        .contains("${repeat((this.rows) ? this.rows : [], (item, index) => html`<p>${item}</p>`)}"));
    assert!(output.usage.uses_repeat);
}

#[test]
fn test_optional_chaining_mode() {
    let options = ConvertOptions {
        optional_chaining: true,
        format: false,
        ..Default::default()
    };
    let source = "import { html, PolymerElement } from '@polymer/polymer';\nclass A extends PolymerElement {\n  static get template() {\n    return html`<span>[[user.address.city]]</span>`;\n  }\n}\n";
    let output = convert_with(source, &options);
    assert!(output.code.contains("<span>${this.user?.address?.city}</span>"));
}

#[test]
fn test_formatted_output_is_valid_module() {
    let source = "import { html, PolymerElement } from '@polymer/polymer';\nclass A extends PolymerElement {\n  static get template() {\n    return html`<p>[[label]]</p>`;\n  }\n  static get properties() { return { label: { type: String, value: 'x' } }; }\n}\n";
    let output = convert_with(source, &ConvertOptions::default());
    assert!(output.code.contains("class A extends LitElement"));
    assert!(output.code.contains("html`<p>${this.label}</p>`"));
    assert!(crate::format::format_module(&output.code).is_ok());
}

// ═══════════════════════════════════════════════════════════════════════════════
// DIAGNOSTICS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_manual_steps_are_reported() {
    let source = "import { html, PolymerElement } from '@polymer/polymer';\nclass A extends PolymerElement {\n  static get template() {\n    return html`<template is=\"dom-if\"><b>x</b></template>`;\n  }\n  static get properties() {\n    return { a: { type: String, observer: '_changed(a, b)' } };\n  }\n  static get observers() {\n    return ['_both(a, b)'];\n  }\n}\n";
    let output = convert(source);
    let found = codes(&output);
    assert!(found.contains(&PL_WARN_DIRECTIVE_CONDITION));
    assert!(found.contains(&PL_WARN_COMPLEX_OBSERVER));
    assert!(found.contains(&PL_WARN_OBSERVERS_ACCESSOR));
    assert!(output
        .code
        .contains("observer: /* TODO: Convert this complex observer manually */\n'_changed(a, b)'"));
    assert!(output.diagnostics.iter().all(|d| d.file == "src/component.js" && d.line > 0));
}
